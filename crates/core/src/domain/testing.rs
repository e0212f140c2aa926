//! Shared test fixtures: a fully populated report in the generator's wire
//! shape, with knobs left to the individual tests to break.

use crate::domain::report::AnalysisReport;
use serde_json::{json, Value};

pub fn valid_llm_report_json(date_label: &str) -> Value {
    let players = [
        ("Luis Arraez", "SD", "1B"),
        ("Freddie Freeman", "LAD", "1B"),
        ("Bobby Witt Jr.", "KC", "SS"),
        ("Jose Altuve", "HOU", "2B"),
        ("Steven Kwan", "CLE", "LF"),
    ];

    let recommendations: Vec<Value> = players
        .iter()
        .enumerate()
        .map(|(i, (name, team, pos))| {
            json!({
                "playerName": name,
                "team": team,
                "position": pos,
                "mlbId": format!("6500{i}"),
                "corePerformance": {
                    "slashLine": ".312/.368/.441",
                    "ops": ".809",
                    "activeHitStreak": 6 - i,
                    "streakDetail": "hit in 9 of last 10",
                    "last7Avg": vec![0.310; 7],
                    "last15Avg": vec![0.298; 15],
                    "last30Avg": vec![0.305; 30],
                },
                "statcastValidation": [
                    {"label": "xBA", "value": ".301", "percentile": 94},
                    {"label": "Hard-Hit %", "value": "41.2%", "percentile": 62},
                    {"label": "K %", "value": "9.8%", "percentile": 98},
                ],
                "matchup": {
                    "pitcherName": "Patrick Corbin",
                    "pitcherTeam": "WSH",
                    "era": "5.42",
                    "whip": "1.51",
                    "battingAverageAgainst": ".289",
                },
                "synthesis": {
                    "predictiveModels": [
                        {"modelName": "NeuralNet v3", "probability": "81%"},
                        {"modelName": "GradientBoost", "probability": "77%"},
                    ],
                    "batterVsPitcher": "7-for-15 career",
                    "parkFactor": "108 (hitter friendly)",
                    "weatherForecast": "Clear, 78F, wind out to LF",
                },
                "finalVerdict": {
                    "compositeHitProbability": 82.5 - (i as f64),
                },
            })
        })
        .collect();

    let synopsis_rows: Vec<Value> = players
        .iter()
        .enumerate()
        .map(|(i, (name, team, pos))| {
            json!({
                "player": name,
                "team": team,
                "position": pos,
                "compositeHitProbability": format!("{:.1}%", 82.5 - (i as f64)),
                "secondaryModelProbability": "79%",
                "activeStreak": format!("{}", 6 - i),
            })
        })
        .collect();

    json!({
        "reportTitle": "STREAKSENSE Daily Analysis",
        "date": date_label,
        "executiveSummary": {
            "situationalOverview": "A hitter-friendly slate with several favorable matchups.",
            "keyTableSynopsis": {
                "headers": ["Player", "Team", "Pos", "Composite", "Model", "Streak"],
                "data": synopsis_rows,
                "notes": ["Composite blends model outputs with matchup context."],
            },
        },
        "recommendations": recommendations,
        "watchListCautionaryNotes": {
            "honorableMentions": [
                {"player": "Trea Turner", "team": "PHI", "reason": "tough lefty matchup", "probability": "71%"},
            ],
            "ineligiblePlayersToNote": [
                {"player": "Aaron Judge", "team": "NYY", "reason": "day-to-day (wrist)"},
            ],
        },
    })
}

pub fn valid_report(date_label: &str) -> AnalysisReport {
    serde_json::from_value::<crate::domain::contract::LlmAnalysisReport>(valid_llm_report_json(
        date_label,
    ))
    .expect("fixture must deserialize")
    .validate_and_into_report()
    .expect("fixture must validate")
}
