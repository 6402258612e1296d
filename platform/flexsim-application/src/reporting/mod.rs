use crate::config::Config;
use flexsim_domain::entities::results::{EpisodeSummary, FinalResults};
use sha2::{Digest, Sha256};

/// Short, stable fingerprint of the raw config text.
pub fn config_hash(config_toml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config_toml.as_bytes());
    let bytes = hasher.finalize();
    to_hex_short(&bytes[..], 12)
}

fn to_hex_short(bytes: &[u8], chars: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(chars);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        if out.len() >= chars {
            break;
        }
        out.push(HEX[(b & 0x0f) as usize] as char);
        if out.len() >= chars {
            break;
        }
    }
    out
}

pub struct SummaryInput<'a> {
    pub config: &'a Config,
    pub config_toml: &'a str,
    pub final_results: &'a FinalResults,
    pub episodes: &'a [EpisodeSummary],
    pub observation_info: &'a [String],
    pub state_info: &'a [String],
    pub dataset_rows: usize,
}

pub fn summary_json(input: &SummaryInput<'_>) -> serde_json::Value {
    let best = input
        .episodes
        .iter()
        .max_by(|a, b| a.total_reward.total_cmp(&b.total_reward))
        .map(|e| {
            serde_json::json!({
                "episode": e.episode,
                "policy": e.policy,
                "total_reward": e.total_reward,
            })
        });

    serde_json::json!({
        "run": {
            "run_id": input.config.run.run_id,
            "agent_mode": input.config.agent.mode,
            "seed": input.config.seed(),
            "config_hash": config_hash(input.config_toml),
            "generated_at": chrono::Utc::now().to_rfc3339(),
        },
        "env": {
            "capacity": input.config.env.capacity,
            "release_time": input.config.env.release_time,
            "episode_length": input.config.env.episode_length,
            "lag": input.config.env.lag.unwrap_or(0),
            "dataset_rows": input.dataset_rows,
        },
        "final_results": input.final_results,
        "best_episode": best,
        "episodes_recorded": input.episodes.len(),
        "observation_info": input.observation_info,
        "state_info": input.state_info,
    })
}
