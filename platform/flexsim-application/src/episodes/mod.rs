use flexsim_domain::entities::results::EpisodeSummary;
use flexsim_domain::services::agent::Agent;
use flexsim_domain::services::env::flex::FlexEnv;
use flexsim_domain::services::env::Environment;
use flexsim_domain::services::memory::ReplayMemory;
use flexsim_domain::value_objects::step_info::StepInfo;
use flexsim_domain::value_objects::transition::Transition;
use tracing::{debug, info_span};

#[derive(Debug, Clone, Copy)]
pub struct EpisodeSettings {
    pub episode: usize,
    /// Dataset row the episode starts at.
    pub start_row: usize,
    /// Run the learning hook every n steps; 0 disables learning.
    pub learn_every: usize,
}

#[derive(Debug, Clone)]
pub struct EpisodeOutcome {
    pub summary: EpisodeSummary,
    pub steps: Vec<StepInfo>,
}

/// Runs one episode from reset to `done`, or until the step budget of
/// `episode_length - 1` is spent.
pub fn run_episode(
    env: &mut FlexEnv,
    agent: &mut dyn Agent,
    memory: &mut ReplayMemory,
    settings: EpisodeSettings,
) -> Result<EpisodeOutcome, String> {
    let _span = info_span!(
        "run_episode",
        episode = settings.episode,
        agent = agent.name(),
        policy = agent.policy()
    )
    .entered();

    let mut observation = env
        .reset_at(settings.start_row)
        .map_err(|err| format!("episode {}: reset failed: {}", settings.episode, err))?;
    let budget = env.episode_length().saturating_sub(1);

    let mut total_reward = 0.0;
    let mut losses = Vec::new();
    let mut steps = 0;

    for step in 1..=budget {
        let action = agent
            .act(&observation)
            .map_err(|err| format!("episode {} step {}: agent failed: {}", settings.episode, step, err))?;
        let result = env
            .step(action)
            .map_err(|err| format!("episode {} step {}: {}", settings.episode, step, err))?;

        total_reward += result.reward;
        steps = step;
        memory.push(Transition {
            observation: std::mem::replace(&mut observation, result.observation.clone()),
            action,
            reward: result.reward,
            next_observation: result.observation,
            done: result.done,
        });

        if settings.learn_every > 0 && step % settings.learn_every == 0 {
            if let Some(loss) = agent
                .learn(memory)
                .map_err(|err| format!("episode {} step {}: learning failed: {}", settings.episode, step, err))?
            {
                losses.push(loss);
            }
        }

        if result.done {
            break;
        }
    }

    let mean_loss = if losses.is_empty() {
        None
    } else {
        Some(losses.iter().sum::<f64>() / losses.len() as f64)
    };
    let summary = EpisodeSummary {
        episode: settings.episode,
        agent: agent.name().to_string(),
        policy: agent.policy().to_string(),
        start_row: settings.start_row,
        steps,
        total_reward,
        mean_loss,
        epsilon: agent.epsilon(),
    };
    debug!(steps, total_reward, ?mean_loss, "episode finished");

    metrics::counter!("flexsim.episode.steps").increment(steps as u64);
    metrics::gauge!("flexsim.episode.total_reward").set(total_reward);

    Ok(EpisodeOutcome {
        summary,
        steps: env.info_log().to_vec(),
    })
}
