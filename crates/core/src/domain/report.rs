use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One calendar date's analysis, in the exact shape the dashboard consumes.
/// Field names are camelCase on the wire; the generative backend is prompted
/// to emit this shape directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub report_title: String,
    /// Presentation copy ("June 12, 2025"), not a lookup key.
    pub date: String,
    pub executive_summary: ExecutiveSummary,
    /// Rank-ordered, index 0 is the generator's top pick. Exactly 5 entries
    /// when freshly generated.
    pub recommendations: Vec<PlayerAnalysis>,
    pub watch_list_cautionary_notes: WatchListCautionaryNotes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub situational_overview: String,
    pub key_table_synopsis: KeyTableSynopsis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyTableSynopsis {
    pub headers: Vec<String>,
    pub data: Vec<SynopsisRow>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynopsisRow {
    pub player: String,
    pub team: String,
    pub position: String,
    pub composite_hit_probability: String,
    pub secondary_model_probability: String,
    pub active_streak: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAnalysis {
    pub player_name: String,
    pub team: String,
    pub position: String,
    pub mlb_id: Option<String>,
    pub core_performance: CorePerformance,
    pub statcast_validation: Vec<StatcastMetric>,
    pub matchup: Matchup,
    pub synthesis: Synthesis,
    pub final_verdict: FinalVerdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorePerformance {
    pub slash_line: String,
    pub ops: String,
    pub active_hit_streak: u32,
    pub streak_detail: Option<String>,
    /// Trailing batting averages, most recent game last. Fixed lengths 7/15/30.
    pub last7_avg: Vec<f64>,
    pub last15_avg: Vec<f64>,
    pub last30_avg: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatcastMetric {
    pub label: String,
    pub value: String,
    /// League percentile, 0..=100.
    pub percentile: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matchup {
    pub pitcher_name: String,
    pub pitcher_team: String,
    pub era: String,
    pub whip: String,
    pub batting_average_against: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Synthesis {
    pub predictive_models: Vec<ModelProbability>,
    pub batter_vs_pitcher: Option<String>,
    pub park_factor: Option<String>,
    pub weather_forecast: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProbability {
    pub model_name: String,
    pub probability: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalVerdict {
    /// Single ranking/display metric, expected range 0..=100.
    pub composite_hit_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchListCautionaryNotes {
    pub honorable_mentions: Vec<HonorableMention>,
    pub ineligible_players_to_note: Vec<IneligiblePlayer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HonorableMention {
    pub player: String,
    pub team: String,
    pub reason: String,
    pub probability: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IneligiblePlayer {
    pub player: String,
    pub team: String,
    pub reason: String,
}

/// Persistence wrapper: one row per date key. Created on first successful
/// generation, overwritten (never mutated) when a stale "today" entry is
/// regenerated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReportEntry {
    pub report: AnalysisReport,
    pub fetched_at: DateTime<Utc>,
}
