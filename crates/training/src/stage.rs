use std::{fmt, path::Path, str::FromStr};

use serde::Serialize;

use crate::{
    config::{load_config_file, DpoConfig, InferConfig, SftConfig, TrainConfig, TrainingError},
    overrides::{apply_overrides, OverrideArg},
};

/// Pipeline stage a configuration bundle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Pretrain,
    Sft,
    Dpo,
    Infer,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Pretrain, Stage::Sft, Stage::Dpo, Stage::Infer];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pretrain => "pretrain",
            Stage::Sft => "sft",
            Stage::Dpo => "dpo",
            Stage::Infer => "infer",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown stage '{s}', expected one of pretrain, sft, dpo, infer")
            })
    }
}

/// One bundle per stage.
#[derive(Debug, Clone, PartialEq)]
pub enum StageConfig {
    Pretrain(TrainConfig),
    Sft(SftConfig),
    Dpo(DpoConfig),
    Infer(InferConfig),
}

impl StageConfig {
    pub fn defaults(stage: Stage) -> Self {
        match stage {
            Stage::Pretrain => StageConfig::Pretrain(TrainConfig::default()),
            Stage::Sft => StageConfig::Sft(SftConfig::default()),
            Stage::Dpo => StageConfig::Dpo(DpoConfig::default()),
            Stage::Infer => StageConfig::Infer(InferConfig::default()),
        }
    }

    pub fn load(stage: Stage, path: impl AsRef<Path>) -> Result<Self, TrainingError> {
        let path = path.as_ref();
        let config = match stage {
            Stage::Pretrain => StageConfig::Pretrain(load_config_file(path)?),
            Stage::Sft => StageConfig::Sft(load_config_file(path)?),
            Stage::Dpo => StageConfig::Dpo(load_config_file(path)?),
            Stage::Infer => StageConfig::Infer(load_config_file(path)?),
        };
        log::info!("loaded {} config from {}", stage, path.display());
        Ok(config)
    }

    pub fn stage(&self) -> Stage {
        match self {
            StageConfig::Pretrain(_) => Stage::Pretrain,
            StageConfig::Sft(_) => Stage::Sft,
            StageConfig::Dpo(_) => Stage::Dpo,
            StageConfig::Infer(_) => Stage::Infer,
        }
    }

    pub fn apply_overrides(self, overrides: &[OverrideArg]) -> Result<Self, TrainingError> {
        Ok(match self {
            StageConfig::Pretrain(cfg) => StageConfig::Pretrain(apply_overrides(cfg, overrides)?),
            StageConfig::Sft(cfg) => StageConfig::Sft(apply_overrides(cfg, overrides)?),
            StageConfig::Dpo(cfg) => StageConfig::Dpo(apply_overrides(cfg, overrides)?),
            StageConfig::Infer(cfg) => StageConfig::Infer(apply_overrides(cfg, overrides)?),
        })
    }

    pub fn validate(&self) -> Result<(), TrainingError> {
        match self {
            StageConfig::Pretrain(cfg) => cfg.validate(),
            StageConfig::Sft(cfg) => cfg.validate(),
            StageConfig::Dpo(cfg) => cfg.validate(),
            StageConfig::Infer(cfg) => cfg.validate(),
        }
    }

    pub fn to_toml(&self) -> Result<String, TrainingError> {
        Ok(match self {
            StageConfig::Pretrain(cfg) => toml::to_string_pretty(cfg)?,
            StageConfig::Sft(cfg) => toml::to_string_pretty(cfg)?,
            StageConfig::Dpo(cfg) => toml::to_string_pretty(cfg)?,
            StageConfig::Infer(cfg) => toml::to_string_pretty(cfg)?,
        })
    }

    pub fn to_json(&self) -> Result<String, TrainingError> {
        fn pretty<T: Serialize>(cfg: &T) -> Result<String, TrainingError> {
            Ok(serde_json::to_string_pretty(cfg)?)
        }
        match self {
            StageConfig::Pretrain(cfg) => pretty(cfg),
            StageConfig::Sft(cfg) => pretty(cfg),
            StageConfig::Dpo(cfg) => pretty(cfg),
            StageConfig::Infer(cfg) => pretty(cfg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>().unwrap(), stage);
        }
        assert_eq!(" SFT ".parse::<Stage>().unwrap(), Stage::Sft);
        assert!("finetune".parse::<Stage>().is_err());
    }

    #[test]
    fn defaults_match_stage() {
        for stage in Stage::ALL {
            let config = StageConfig::defaults(stage);
            assert_eq!(config.stage(), stage);
            assert!(config.validate().is_ok());
        }
    }
}
