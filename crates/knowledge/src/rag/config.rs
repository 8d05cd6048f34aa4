//! Grounding configuration.
//!
//! Loaded once from `.gradus/grounding.yaml` (or built-in defaults) and
//! shared read-only by the expander, matcher, fuser and formatter.

use gradus_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Trigger terms mapped to the phrase appended to a matching query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionRule {
    pub triggers: Vec<String>,
    pub phrase: String,
}

impl ExpansionRule {
    pub fn new(triggers: &[&str], phrase: &str) -> Self {
        Self {
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            phrase: phrase.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingConfig {
    /// Scanned in order; the first matching trigger wins
    pub expansion_rules: Vec<ExpansionRule>,

    /// A query containing any of these is already disambiguated
    pub category_keywords: Vec<String>,

    /// Dropped from topic keywords
    pub stop_words: Vec<String>,

    /// Maximum hits in a grounded context
    pub context_cap: usize,

    /// Maximum topic-matched documents
    pub topic_limit: usize,

    /// Topic lookup runs only when fewer number matches than this were found
    pub number_match_threshold: usize,

    /// Per-strategy deadline at query time
    pub strategy_timeout_ms: u64,

    pub citation_header: String,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            expansion_rules: default_expansion_rules(),
            category_keywords: to_strings(&[
                "vodka", "водка", "горілка", "горилка", "wine", "вино", "вина", "spirits",
                "спірт", "алкоголь", "коктейлі", "коктейль", "cocktails", "cocktail",
                "настоянка", "liqueur", "лікер", "rtd", "ready-to-drink",
            ]),
            stop_words: to_strings(&[
                "який", "яка", "яке", "як", "що", "коли", "де", "можна", "треба", "потрібно",
                "для", "при", "або", "але", "та", "це", "той", "ця",
            ]),
            context_cap: 3,
            topic_limit: 2,
            number_match_threshold: 2,
            strategy_timeout_ms: 5000,
            citation_header: super::citation::DEFAULT_HEADER.to_string(),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_expansion_rules() -> Vec<ExpansionRule> {
    const HOUSE: &str = "Торговий Дім АВ";
    let rule = |triggers: &[&str], phrase: &str| {
        ExpansionRule::new(triggers, &phrase.replace("{house}", HOUSE))
    };

    vec![
        rule(&["greenday", "грінді"], "greenday vodka горілка водка premium {house}"),
        rule(&["green day"], "greenday vodka горілка vodka premium {house}"),
        rule(&["грін дей"], "greenday vodka горілка водка premium {house}"),
        rule(&["helsinki", "хельсінкі"], "helsinki vodka горілка водка premium scandinavian {house}"),
        rule(&["ukrainka", "українка"], "ukrainka vodka горілка водка traditional ukrainian {house}"),
        rule(&["довбуш", "dovbush"], "dovbush cognac коньяк spirits {house}"),
        rule(&["adjari", "аджарі"], "adjari cognac wine коньяк вино georgian {house}"),
        rule(&["funju", "фунжу", "фунджу"], "funju soju соджу korean {house}"),
        rule(&["villa", "вілла"], "villa wine вино villa.ua ukrainian {house}"),
        rule(&["villa.ua"], "villa wine вино {house}"),
        rule(&["kristi valley", "крісті"], "kristi valley wine вино french {house}"),
        rule(&["didi lari", "діді ларі"], "didi lari wine вино georgian {house}"),
        rule(&["wineviaggio"], "wineviaggio wine вино italian {house}"),
        rule(
            &["торговий дім ав", "тдав", "td av", "trading house av"],
            "{house} ТДАВ бренди портфоліо vodka wine cognac soju",
        ),
        rule(
            &["які бренди"],
            "{house} портфоліо бренди GREENDAY HELSINKI UKRAINKA VILLA FUNJU DOVBUSH ADJARI",
        ),
        rule(
            &["яка продукція"],
            "{house} портфоліо бренди продукція асортимент vodka wine cognac soju",
        ),
        rule(&["асортимент"], "{house} портфоліо бренди продукція асортимент"),
    ]
}

impl GroundingConfig {
    /// Path of the grounding config inside a workspace.
    pub fn path(workspace: &Path) -> PathBuf {
        workspace.join(".gradus").join("grounding.yaml")
    }

    /// Load from the workspace, falling back to defaults when absent.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        let path = Self::path(workspace);
        if !path.exists() {
            tracing::debug!("No grounding config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("Failed to read grounding config {:?}: {}", path, e))
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| {
            AppError::Config(format!("Failed to parse grounding config {:?}: {}", path, e))
        })?;

        config.validate()?;
        tracing::debug!(
            "Loaded grounding config with {} expansion rules",
            config.expansion_rules.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.context_cap == 0 {
            return Err(AppError::Config("context_cap must be positive".to_string()));
        }
        if let Some(rule) = self
            .expansion_rules
            .iter()
            .find(|r| r.phrase.trim().is_empty() || r.triggers.iter().any(|t| t.trim().is_empty()))
        {
            return Err(AppError::Config(format!(
                "Expansion rule {:?} has an empty trigger or phrase",
                rule.triggers
            )));
        }
        Ok(())
    }

    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }
}
