use flexsim_application::config::{AgentMode, Config};
use flexsim_domain::repositories::artifacts::ArtifactWriter;
use flexsim_domain::repositories::dataset::DatasetRepository;
use flexsim_domain::repositories::q_function::QFunction;
use flexsim_infrastructure::approximators::LinearQFunction;
use flexsim_infrastructure::artifacts::FilesystemArtifactWriter;
use flexsim_infrastructure::dataset::CsvDatasetRepository;

pub struct EngineDeps {
    pub datasets: Box<dyn DatasetRepository>,
    pub artifacts: Box<dyn ArtifactWriter>,
    pub learning_rate: Option<f64>,
    pub seed: u64,
}

impl EngineDeps {
    /// Builds the approximator once the environment knows its dimensions.
    pub fn q_function(&self, inputs: usize, actions: usize) -> Result<Box<dyn QFunction>, String> {
        let learning_rate = self
            .learning_rate
            .ok_or_else(|| "no approximator configured for this agent mode".to_string())?;
        Ok(Box::new(LinearQFunction::new(
            inputs,
            actions,
            learning_rate,
            self.seed,
        )?))
    }
}

pub struct ValidateDeps {
    pub datasets: Box<dyn DatasetRepository>,
}

pub fn build_engine_deps(config: &Config) -> EngineDeps {
    EngineDeps {
        datasets: Box::new(CsvDatasetRepository::new()),
        artifacts: Box::new(FilesystemArtifactWriter::new()),
        learning_rate: (config.agent.mode == AgentMode::Qlearner).then(|| config.learning_rate()),
        seed: config.seed(),
    }
}

pub fn build_validate_deps() -> ValidateDeps {
    ValidateDeps {
        datasets: Box::new(CsvDatasetRepository::new()),
    }
}
