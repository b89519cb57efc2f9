use anyhow::{Result, bail};
use avmaster_game::{LevelCatalog, LevelCategory};
use regex::Regex;

pub mod scenario;

pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

const LEVEL_ID_PATTERN: &str = r"^[a-z]+-[0-9]+$";

fn parse_category(token: &str) -> Option<LevelCategory> {
    match token {
        "audio" => Some(LevelCategory::Audio),
        "lighting" => Some(LevelCategory::Lighting),
        "video" => Some(LevelCategory::Video),
        "set" => Some(LevelCategory::Set),
        _ => None,
    }
}

/// Resolve `--levels` tokens (level ids, category names, or `all`) into
/// level ids in progression order.
pub fn resolve_levels(catalog: &LevelCatalog, tokens: &[String]) -> Result<Vec<String>> {
    let id_pattern = Regex::new(LEVEL_ID_PATTERN)?;
    let mut wanted: Vec<&str> = Vec::new();
    let mut request_all = tokens.is_empty();

    for token in tokens {
        let token = token.to_lowercase();
        if token == "all" {
            request_all = true;
            continue;
        }
        if let Some(category) = parse_category(&token) {
            if let Some(ids) = catalog.categories().get(&category) {
                wanted.extend(ids.iter().map(String::as_str));
            }
            continue;
        }
        if !id_pattern.is_match(&token) {
            bail!("Unrecognized level token: {token}");
        }
        let Some(id) = catalog.level_order().iter().find(|id| **id == token) else {
            bail!("Unknown level: {token}");
        };
        wanted.push(id);
    }

    Ok(catalog
        .level_order()
        .iter()
        .filter(|id| request_all || wanted.contains(&id.as_str()))
        .cloned()
        .collect())
}
