use std::collections::BTreeMap;

/// CIDR -> 组织名称，按CIDR字符串排序，相同CIDR后写入的覆盖先写入的
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrefixMap {
    entries: BTreeMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一条记录，返回被覆盖的旧组织名称（如果有）
    pub fn insert(&mut self, cidr: impl Into<String>, organization: impl Into<String>) -> Option<String> {
        self.entries.insert(cidr.into(), organization.into())
    }

    pub fn get(&self, cidr: &str) -> Option<&str> {
        self.entries.get(cidr).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(cidr, org)| (cidr.as_str(), org.as_str()))
    }

    pub fn cidrs(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
