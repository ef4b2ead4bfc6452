use std::{ path::PathBuf, sync::Arc, time::Duration };
use anyhow::{ anyhow, bail, Context, Result };
use clap::ValueEnum;
use headless_chrome::{ Browser, LaunchOptions, Tab };
use reqwest::{ header::USER_AGENT, Client, Url };
use tracing::{ debug, info, warn };

pub static CLIENT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// 获取页面的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// 无头浏览器，能拿到客户端渲染后的内容
    Browser,
    /// 直接HTTP GET，不执行脚本
    Http,
}

/// 打开一个地址，返回渲染后的HTML
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch_html(&mut self, url: &Url) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct BrowserOptions {
    pub chrome_path: Option<PathBuf>,
    /// 连接已经在运行的浏览器(DevTools websocket地址)，不再自己启动
    pub ws_url: Option<String>,
    pub sandbox: bool,
    pub timeout: Duration,
}

/// 浏览器会话，drop时关闭浏览器进程
pub struct BrowserSession {
    browser: Browser,
    timeout: Duration,
}

impl BrowserSession {
    pub async fn open(options: BrowserOptions) -> Result<Self> {
        let timeout = options.timeout;
        let browser = tokio::task::spawn_blocking(move || launch_or_connect(&options)).await
            .context("browser launch task failed")??;
        Ok(Self { browser, timeout })
    }

    pub fn close(self) {
        debug!("closing browser session");
        drop(self.browser);
    }
}

impl PageSource for BrowserSession {
    async fn fetch_html(&mut self, url: &Url) -> Result<String> {
        let browser = self.browser.clone();
        let timeout = self.timeout;
        let url = url.clone();
        tokio::task::spawn_blocking(move || render_body(&browser, &url, timeout)).await
            .context("browser render task failed")?
    }
}

fn launch_or_connect(options: &BrowserOptions) -> Result<Browser> {
    if let Some(ws_url) = &options.ws_url {
        info!(%ws_url, "connecting to running browser");
        return Browser::connect(ws_url.clone()).with_context(||
            format!("connecting to browser at {}", ws_url)
        );
    }

    let launch_options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(options.sandbox)
        .path(options.chrome_path.clone())
        // 浏览器空闲超时要比单次导航长，否则会在等待加载时被断开
        .idle_browser_timeout(options.timeout * 2)
        .build()
        .map_err(|e| anyhow!("invalid browser launch options: {}", e))?;
    info!("launching headless browser");
    Browser::new(launch_options).context("launching browser")
}

fn render_body(browser: &Browser, url: &Url, timeout: Duration) -> Result<String> {
    let tab = browser.new_tab().context("opening browser tab")?;
    tab.set_default_timeout(timeout);

    let result = navigate_and_read(&tab, url);
    // 连接外部浏览器时不会杀进程，标签页要自己关
    if let Err(e) = tab.close(true) {
        warn!("failed to close tab: {:#}", e);
    }
    result
}

fn navigate_and_read(tab: &Arc<Tab>, url: &Url) -> Result<String> {
    info!(%url, "navigating");
    tab.navigate_to(url.as_str()).with_context(|| format!("navigating to {}", url))?;
    tab.wait_until_navigated().with_context(|| format!("waiting for {} to load", url))?;
    let body = tab.wait_for_element("body").context("locating page body")?;
    let html = body.get_content().context("reading page body")?;
    debug!(bytes = html.len(), "captured page body");
    Ok(html)
}

/// 不经过浏览器，直接请求页面
pub struct HttpSource {
    client: Client,
    user_agent: String,
}

impl HttpSource {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().context("building http client")?;
        Ok(Self::with_client(client, user_agent))
    }

    pub fn with_client(client: Client, user_agent: &str) -> Self {
        Self { client, user_agent: user_agent.to_string() }
    }
}

impl PageSource for HttpSource {
    async fn fetch_html(&mut self, url: &Url) -> Result<String> {
        info!(%url, "requesting");
        let response = self.client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send().await
            .with_context(|| format!("requesting {}", url))?;

        if !response.status().is_success() {
            bail!("HTTP request failed with status {}", response.status());
        }

        let content = response.text().await.context("reading response body")?;
        debug!(bytes = content.len(), "received page");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{ io::{ AsyncReadExt, AsyncWriteExt }, net::TcpListener };

    // 本地起一个只应答一次的HTTP服务
    async fn serve_once(status_line: &'static str, body: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "{}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        Url::parse(&format!("http://{}/search?search%5Bsearch%5D=x&commit=Search", addr)).unwrap()
    }

    fn local_source() -> HttpSource {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpSource::with_client(client, CLIENT_USER_AGENT)
    }

    #[tokio::test]
    async fn http_source_returns_body() {
        let url = serve_once("HTTP/1.1 200 OK", "<table><tr><td>x</td></tr></table>").await;
        let mut source = local_source();
        let html = source.fetch_html(&url).await.unwrap();
        assert!(html.contains("<table>"));
    }

    #[tokio::test]
    async fn http_source_fails_on_error_status() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable", "busy").await;
        let mut source = local_source();
        let err = source.fetch_html(&url).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
