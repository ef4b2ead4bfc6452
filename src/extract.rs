use ipnetwork::Ipv4Network;
use once_cell::sync::Lazy;
use regex::Regex;
use select::{ document::Document, node::Node, predicate::Name };
use tracing::{ debug, info };

use crate::models::PrefixMap;

// 只检查形状，不检查八位组范围(0-255)和前缀长度(0-32)
static CIDR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}/[0-9]{1,2}").unwrap()
});

/// 从搜索结果页面的表格中提取 CIDR -> 组织名称
#[derive(Debug, Default, Clone, Copy)]
pub struct Extractor {
    /// 为true时，匹配到的CIDR必须是合法的IPv4网段，否则整行跳过
    pub strict: bool,
}

impl Extractor {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn extract(&self, html: &str) -> PrefixMap {
        // html5ever容错解析，不会失败
        let document = Document::from(html);
        let mut prefixes = PrefixMap::new();

        for (index, row) in document.find(Name("tr")).enumerate() {
            let cells: Vec<Node> = row.find(Name("td")).collect();
            // 表头、分隔行
            if cells.len() < 2 {
                continue;
            }

            let link_text: String = cells[0]
                .find(Name("a"))
                .map(|a| a.text())
                .collect();
            let Some(cidr) = self.first_cidr(&link_text) else {
                debug!(row = index, text = %link_text.trim(), "no cidr in row, skipped");
                continue;
            };

            let organization = cells[1].text().trim().to_string();
            if let Some(previous) = prefixes.insert(cidr, organization.as_str()) {
                debug!(cidr, %previous, current = %organization, "duplicate cidr, keeping later row");
            }
        }

        info!(count = prefixes.len(), "extracted prefixes");
        prefixes
    }

    // 每行只取第一个匹配
    fn first_cidr<'a>(&self, text: &'a str) -> Option<&'a str> {
        let cidr = CIDR_RE.find(text)?.as_str();
        if self.strict && cidr.parse::<Ipv4Network>().is_err() {
            debug!(cidr, "not a valid ipv4 network, skipped");
            return None;
        }
        Some(cidr)
    }
}
