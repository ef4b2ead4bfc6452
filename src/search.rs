use anyhow::{ Context, Result };
use reqwest::Url;

pub static DEFAULT_BASE_URL: &str = "https://bgp.he.net/search";

/// 构造搜索地址：<base>?search%5Bsearch%5D=<org>&commit=Search，组织名称做表单编码
pub fn build_search_url(base_url: &str, org: &str) -> Result<Url> {
    Url::parse_with_params(base_url, &[
        ("search[search]", org),
        ("commit", "Search"),
    ]).with_context(|| format!("invalid search base url: {}", base_url))
}
