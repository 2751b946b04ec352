pub mod configuration;

pub use configuration::{
    AlignmentConfig, BinningConfig, BridgeConfig, ConfigurationManager, LoggingConfig,
    PipelineError, ResolverConfiguration, SearchConfig, StreamingConfig,
};
