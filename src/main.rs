mod extract;
mod fetch;
mod models;
mod output;
mod search;

use std::{ io, path::PathBuf, process, time::Duration };
use anyhow::Result;
use clap::{ ArgAction, Parser };
use reqwest::Url;
use tracing::{ error, info };
use tracing_subscriber::EnvFilter;

use crate::extract::Extractor;
use crate::fetch::{ BrowserOptions, BrowserSession, Engine, HttpSource, PageSource, CLIENT_USER_AGENT };
use crate::models::PrefixMap;
use crate::output::{ print_prefixes, save_cidrs };
use crate::search::{ build_search_url, DEFAULT_BASE_URL };

static BANNER: &str =
    r"
____ ____ _  _ ___  ____ ___  ___  ____ ____
|__| [__  |\ | |__] |___ |__] |__] |___ |__/
  |  ___] | \| |    |___ |    |    |___ |  \
";

static USAGE_EXAMPLES: &str =
    "Usages: ./asnpepper --org <organization>
        ./asnpepper --org <organization> --output <file.txt>
";

/// 按组织名称在 bgp.he.net 搜索，提取结果表格中的CIDR和所属组织
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, before_help = BANNER)]
struct Args {
    /// 要搜索的组织名称
    #[arg(long)]
    org: Option<String>,

    /// 把CIDR(每行一个)保存到该文件
    #[arg(long)]
    output: Option<PathBuf>,

    /// 获取页面的方式
    #[arg(long, value_enum, env = "ASNPEPPER_ENGINE", default_value_t = Engine::Browser)]
    engine: Engine,

    /// 页面加载超时(秒)
    #[arg(long, env = "ASNPEPPER_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Chrome/Chromium 可执行文件路径，不指定则自动查找
    #[arg(long, env = "ASNPEPPER_CHROME")]
    chrome_path: Option<PathBuf>,

    /// 连接已经在运行的浏览器(DevTools websocket地址)
    #[arg(long, env = "ASNPEPPER_WS_URL")]
    ws_url: Option<String>,

    /// 不使用Chrome沙箱启动(容器内运行时需要)
    #[arg(long)]
    no_sandbox: bool,

    /// http方式请求时使用的User-Agent
    #[arg(long, env = "ASNPEPPER_USER_AGENT", default_value = CLIENT_USER_AGENT)]
    user_agent: String,

    /// 搜索接口地址
    #[arg(long, env = "ASNPEPPER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// 只保留合法的IPv4网段(八位组0-255，前缀0-32)
    #[arg(long)]
    strict: bool,

    /// 输出更多日志，-v为info，-vv为debug
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    // 没给或者给了空字符串都当作没给
    fn requested_org(&self) -> Option<&str> {
        self.org
            .as_deref()
            .map(str::trim)
            .filter(|org| !org.is_empty())
    }
}

fn print_usage() {
    println!("{}\n{}", BANNER, USAGE_EXAMPLES);
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

#[tokio::main]
async fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        // --help、--version 以及参数错误都交给clap处理
        Err(e) => e.exit(),
    };
    init_logging(args.verbose);

    let Some(org) = args.requested_org() else {
        print_usage();
        return;
    };

    if let Err(e) = run(&args, org).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(args: &Args, org: &str) -> Result<()> {
    let url = build_search_url(&args.base_url, org)?;
    let extractor = Extractor::new(args.strict);
    let timeout = Duration::from_secs(args.timeout);
    info!(%org, engine = ?args.engine, "searching");

    let prefixes = match args.engine {
        Engine::Browser => {
            let mut session = BrowserSession::open(BrowserOptions {
                chrome_path: args.chrome_path.clone(),
                ws_url: args.ws_url.clone(),
                sandbox: !args.no_sandbox,
                timeout,
            }).await?;
            let result = lookup(&mut session, &url, &extractor).await;
            // 出错也要先关掉浏览器
            session.close();
            result?
        }
        Engine::Http => {
            let mut source = HttpSource::new(&args.user_agent, timeout)?;
            lookup(&mut source, &url, &extractor).await?
        }
    };

    print_prefixes(&mut io::stdout().lock(), &prefixes)?;

    if let Some(path) = &args.output {
        save_cidrs(path, &prefixes)?;
    }

    Ok(())
}

async fn lookup<S: PageSource>(source: &mut S, url: &Url, extractor: &Extractor) -> Result<PrefixMap> {
    let html = source.fetch_html(url).await?;
    Ok(extractor.extract(&html))
}
