use crate::domain::report::{
    AnalysisReport, CorePerformance, ExecutiveSummary, FinalVerdict, HonorableMention,
    IneligiblePlayer, KeyTableSynopsis, Matchup, ModelProbability, PlayerAnalysis, StatcastMetric,
    SynopsisRow, Synthesis, WatchListCautionaryNotes,
};
use anyhow::ensure;
use serde::{Deserialize, Serialize};

pub const RECOMMENDATION_COUNT: usize = 5;
pub const MIN_STATCAST_METRICS: usize = 3;
pub const MIN_PREDICTIVE_MODELS: usize = 2;
pub const TRAILING_WINDOWS: [usize; 3] = [7, 15, 30];

/// Raw mirror of the report schema as the model emits it. Numeric fields are
/// widened so range errors surface as validation messages instead of opaque
/// decode failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnalysisReport {
    pub report_title: String,
    pub date: String,
    pub executive_summary: LlmExecutiveSummary,
    pub recommendations: Vec<LlmPlayerAnalysis>,
    pub watch_list_cautionary_notes: LlmWatchList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmExecutiveSummary {
    pub situational_overview: String,
    pub key_table_synopsis: LlmKeyTableSynopsis,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmKeyTableSynopsis {
    pub headers: Vec<String>,
    pub data: Vec<LlmSynopsisRow>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSynopsisRow {
    pub player: String,
    pub team: String,
    pub position: String,
    pub composite_hit_probability: String,
    pub secondary_model_probability: String,
    pub active_streak: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmPlayerAnalysis {
    pub player_name: String,
    pub team: String,
    pub position: String,
    #[serde(default)]
    pub mlb_id: Option<String>,
    pub core_performance: LlmCorePerformance,
    pub statcast_validation: Vec<LlmStatcastMetric>,
    pub matchup: Matchup,
    pub synthesis: LlmSynthesis,
    pub final_verdict: LlmFinalVerdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmCorePerformance {
    pub slash_line: String,
    pub ops: String,
    pub active_hit_streak: i64,
    #[serde(default)]
    pub streak_detail: Option<String>,
    pub last7_avg: Vec<f64>,
    pub last15_avg: Vec<f64>,
    pub last30_avg: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmStatcastMetric {
    pub label: String,
    pub value: String,
    pub percentile: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSynthesis {
    pub predictive_models: Vec<ModelProbability>,
    #[serde(default)]
    pub batter_vs_pitcher: Option<String>,
    #[serde(default)]
    pub park_factor: Option<String>,
    #[serde(default)]
    pub weather_forecast: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmFinalVerdict {
    pub composite_hit_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmWatchList {
    #[serde(default)]
    pub honorable_mentions: Vec<HonorableMention>,
    #[serde(default)]
    pub ineligible_players_to_note: Vec<IneligiblePlayer>,
}

impl LlmAnalysisReport {
    pub fn validate_and_into_report(self) -> anyhow::Result<AnalysisReport> {
        ensure!(
            self.recommendations.len() == RECOMMENDATION_COUNT,
            "report must contain exactly {RECOMMENDATION_COUNT} recommendations (got {})",
            self.recommendations.len()
        );
        ensure!(
            self.executive_summary.key_table_synopsis.data.len() == RECOMMENDATION_COUNT,
            "synopsis table must have exactly {RECOMMENDATION_COUNT} rows (got {})",
            self.executive_summary.key_table_synopsis.data.len()
        );

        let mut recommendations = Vec::with_capacity(self.recommendations.len());
        for (idx, rec) in self.recommendations.into_iter().enumerate() {
            recommendations.push(rec.validate_and_into_analysis(idx)?);
        }

        Ok(AnalysisReport {
            report_title: self.report_title,
            date: self.date,
            executive_summary: ExecutiveSummary {
                situational_overview: self.executive_summary.situational_overview,
                key_table_synopsis: KeyTableSynopsis {
                    headers: self.executive_summary.key_table_synopsis.headers,
                    data: self
                        .executive_summary
                        .key_table_synopsis
                        .data
                        .into_iter()
                        .map(LlmSynopsisRow::into_row)
                        .collect(),
                    notes: self.executive_summary.key_table_synopsis.notes,
                },
            },
            recommendations,
            watch_list_cautionary_notes: WatchListCautionaryNotes {
                honorable_mentions: self.watch_list_cautionary_notes.honorable_mentions,
                ineligible_players_to_note: self
                    .watch_list_cautionary_notes
                    .ineligible_players_to_note,
            },
        })
    }
}

impl LlmSynopsisRow {
    fn into_row(self) -> SynopsisRow {
        SynopsisRow {
            player: self.player,
            team: self.team,
            position: self.position,
            composite_hit_probability: self.composite_hit_probability,
            secondary_model_probability: self.secondary_model_probability,
            active_streak: self.active_streak,
        }
    }
}

impl LlmPlayerAnalysis {
    fn validate_and_into_analysis(self, idx: usize) -> anyhow::Result<PlayerAnalysis> {
        let player_name = self.player_name.trim().to_string();
        ensure!(
            !player_name.is_empty(),
            "recommendation {idx}: playerName must be non-empty"
        );
        let team = self.team.trim().to_string();
        ensure!(
            !team.is_empty(),
            "recommendation {idx} ({player_name}): team must be non-empty"
        );

        ensure!(
            (0..=i64::from(u32::MAX)).contains(&self.core_performance.active_hit_streak),
            "recommendation {idx} ({player_name}): activeHitStreak out of range: {}",
            self.core_performance.active_hit_streak
        );
        for (window, values) in TRAILING_WINDOWS.iter().zip([
            &self.core_performance.last7_avg,
            &self.core_performance.last15_avg,
            &self.core_performance.last30_avg,
        ]) {
            ensure!(
                values.len() == *window,
                "recommendation {idx} ({player_name}): trailing-average window {window} must have \
                 {window} entries (got {})",
                values.len()
            );
        }

        ensure!(
            self.statcast_validation.len() >= MIN_STATCAST_METRICS,
            "recommendation {idx} ({player_name}): need at least {MIN_STATCAST_METRICS} statcast \
             metrics (got {})",
            self.statcast_validation.len()
        );
        let mut statcast = Vec::with_capacity(self.statcast_validation.len());
        for metric in self.statcast_validation {
            ensure!(
                (0..=100).contains(&metric.percentile),
                "recommendation {idx} ({player_name}): percentile out of range for {}: {}",
                metric.label,
                metric.percentile
            );
            statcast.push(StatcastMetric {
                label: metric.label,
                value: metric.value,
                percentile: metric.percentile as u8,
            });
        }

        ensure!(
            self.synthesis.predictive_models.len() >= MIN_PREDICTIVE_MODELS,
            "recommendation {idx} ({player_name}): need at least {MIN_PREDICTIVE_MODELS} \
             predictive models (got {})",
            self.synthesis.predictive_models.len()
        );

        let composite = self.final_verdict.composite_hit_probability;
        ensure!(
            (0.0..=100.0).contains(&composite),
            "recommendation {idx} ({player_name}): compositeHitProbability must be within \
             0..=100 (got {composite})"
        );

        Ok(PlayerAnalysis {
            player_name,
            team,
            position: self.position,
            mlb_id: self.mlb_id.filter(|s| !s.trim().is_empty()),
            core_performance: CorePerformance {
                slash_line: self.core_performance.slash_line,
                ops: self.core_performance.ops,
                active_hit_streak: self.core_performance.active_hit_streak as u32,
                streak_detail: self.core_performance.streak_detail,
                last7_avg: self.core_performance.last7_avg,
                last15_avg: self.core_performance.last15_avg,
                last30_avg: self.core_performance.last30_avg,
            },
            statcast_validation: statcast,
            matchup: self.matchup,
            synthesis: Synthesis {
                predictive_models: self.synthesis.predictive_models,
                batter_vs_pitcher: self.synthesis.batter_vs_pitcher,
                park_factor: self.synthesis.park_factor,
                weather_forecast: self.synthesis.weather_forecast,
            },
            final_verdict: FinalVerdict {
                composite_hit_probability: composite,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::valid_llm_report_json;

    #[test]
    fn accepts_fully_populated_report() {
        let raw: LlmAnalysisReport =
            serde_json::from_value(valid_llm_report_json("June 1, 2025")).unwrap();
        let report = raw.validate_and_into_report().unwrap();
        assert_eq!(report.recommendations.len(), RECOMMENDATION_COUNT);
        assert_eq!(report.recommendations[0].core_performance.last30_avg.len(), 30);
    }

    #[test]
    fn rejects_wrong_recommendation_count() {
        let mut json = valid_llm_report_json("June 1, 2025");
        json["recommendations"]
            .as_array_mut()
            .unwrap()
            .pop();
        let raw: LlmAnalysisReport = serde_json::from_value(json).unwrap();
        let err = raw.validate_and_into_report().unwrap_err();
        assert!(err.to_string().contains("exactly 5 recommendations"));
    }

    #[test]
    fn rejects_short_trailing_window() {
        let mut json = valid_llm_report_json("June 1, 2025");
        json["recommendations"][2]["corePerformance"]["last15Avg"]
            .as_array_mut()
            .unwrap()
            .pop();
        let raw: LlmAnalysisReport = serde_json::from_value(json).unwrap();
        assert!(raw.validate_and_into_report().is_err());
    }

    #[test]
    fn rejects_percentile_above_100() {
        let mut json = valid_llm_report_json("June 1, 2025");
        json["recommendations"][0]["statcastValidation"][0]["percentile"] =
            serde_json::json!(104);
        let raw: LlmAnalysisReport = serde_json::from_value(json).unwrap();
        let err = raw.validate_and_into_report().unwrap_err();
        assert!(err.to_string().contains("percentile out of range"));
    }

    #[test]
    fn rejects_composite_probability_out_of_range() {
        let mut json = valid_llm_report_json("June 1, 2025");
        json["recommendations"][4]["finalVerdict"]["compositeHitProbability"] =
            serde_json::json!(128.5);
        let raw: LlmAnalysisReport = serde_json::from_value(json).unwrap();
        assert!(raw.validate_and_into_report().is_err());
    }

    #[test]
    fn rejects_too_few_predictive_models() {
        let mut json = valid_llm_report_json("June 1, 2025");
        json["recommendations"][1]["synthesis"]["predictiveModels"]
            .as_array_mut()
            .unwrap()
            .truncate(1);
        let raw: LlmAnalysisReport = serde_json::from_value(json).unwrap();
        assert!(raw.validate_and_into_report().is_err());
    }
}
