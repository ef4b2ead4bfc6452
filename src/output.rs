use std::{ fs, io::Write, path::Path };
use anyhow::{ Context, Result };
use tracing::info;

use crate::models::PrefixMap;

/// 每行输出 "<CIDR> <组织名称>"
pub fn print_prefixes<W: Write>(out: &mut W, prefixes: &PrefixMap) -> Result<()> {
    for (cidr, organization) in prefixes.iter() {
        writeln!(out, "{} {}", cidr, organization)?;
    }
    out.flush()?;
    Ok(())
}

/// 只写CIDR，每行一个，末尾不加换行；文件已存在则覆盖
pub fn save_cidrs(path: &Path, prefixes: &PrefixMap) -> Result<()> {
    let content = prefixes.cidrs().collect::<Vec<_>>().join("\n");
    fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), count = prefixes.len(), "saved cidrs");
    Ok(())
}
