use log::{debug, info, warn};
use std::fmt;
use tokio::process::Command;

// @module: Installed font lookup through fontconfig

/// One installed font file
#[derive(Debug, Clone, PartialEq)]
pub struct FontEntry {
    pub file: String,
    /// Family names, lowercased
    pub names: Vec<String>,
    /// Style names, lowercased
    pub styles: Vec<String>,
}

impl FontEntry {
    pub fn has_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.names.iter().any(|n| *n == name)
    }

    pub fn has_style(&self, style: &str) -> bool {
        let style = style.to_lowercase();
        self.styles.iter().any(|s| *s == style)
    }
}

impl fmt::Display for FontEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.names.join(","), self.styles.join(","))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Font catalogue built from `fc-list` output
#[derive(Debug, Clone, Default)]
pub struct FontCatalog {
    fonts: Vec<FontEntry>,
}

impl FontCatalog {
    /// Parses `file: names:style=styles` lines; a line without styles is regular
    pub fn parse(output: &str) -> Self {
        let mut fonts: Vec<FontEntry> = output
            .lines()
            .filter_map(|line| {
                let mut parts = line.splitn(3, ':');
                let file = parts.next()?.trim();
                let names = split_list(parts.next()?);
                let styles = match parts.next() {
                    Some(styles) => split_list(styles.split_once('=').map_or(styles, |(_, v)| v)),
                    None => vec!["regular".to_string()],
                };
                if file.is_empty() || names.is_empty() {
                    return None;
                }
                Some(FontEntry {
                    file: file.to_string(),
                    names,
                    styles,
                })
            })
            .collect();
        fonts.sort_by(|a, b| a.file.cmp(&b.file));
        FontCatalog { fonts }
    }

    /// Asks fontconfig for the installed fonts; `None` when it is unavailable
    pub async fn load() -> Option<Self> {
        match Command::new("fc-list").kill_on_drop(true).output().await {
            Ok(output) if output.status.success() => Some(Self::parse(&String::from_utf8_lossy(&output.stdout))),
            Ok(output) => {
                debug!("fc-list exited with {}", output.status);
                None
            }
            Err(e) => {
                debug!("fc-list unavailable: {}", e);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Font with this family name, preferring `style`, then regular, then any
    pub fn find(&self, name: &str, style: &str) -> Option<&FontEntry> {
        let named: Vec<&FontEntry> = self.fonts.iter().filter(|f| f.has_name(name)).collect();
        named
            .iter()
            .find(|f| f.has_style(style))
            .or_else(|| named.iter().find(|f| f.has_style("regular")))
            .or_else(|| named.first())
            .copied()
    }
}

/// Warns when the font the document names is not installed
pub async fn check_font(name: &str) {
    let Some(catalog) = FontCatalog::load().await else {
        debug!("No font catalogue available, skipping check for '{}'", name);
        return;
    };
    match catalog.find(name, "regular") {
        Some(font) => info!("Using font '{}' ({})", name, font.file),
        None => warn!("Font '{}' is not installed; players will substitute another font", name),
    }
}
