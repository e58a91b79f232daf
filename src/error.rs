use thiserror::Error;

/// Errors raised while turning the `-agentpath` option string into a
/// [`Configuration`](crate::config::Configuration). These are fatal: the
/// agent refuses to load.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid option `{0}`: expected key=value")]
    Malformed(String),

    #[error("invalid value `{value}` for option `{key}`: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Failures reported by the host VM through JVMTI or JNI.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("{operation} failed: {error}")]
    Jvmti {
        operation: &'static str,
        error: crate::sys::jvmti::jvmtiError,
    },

    #[error("JNI call failed: {0}")]
    Jni(String),

    #[error("class tag space exhausted after {0} classes")]
    TagSpaceExhausted(usize),

    #[error("heap walk aborted: {0}")]
    WalkAborted(String),

    #[error("host capability unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a single pipeline action. The pipeline logs it and carries on.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("signal delivery failed: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("action panicked: {0}")]
    Panicked(String),
}

/// Errors that stop the agent from arming.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("host error: {0}")]
    Host(#[from] HostError),

    #[error("GetEnv for JVMTI failed with JNI error {0}")]
    Env(crate::sys::jni::jint),

    #[error("agent is already armed")]
    AlreadyArmed,
}
