mod accumulator;
mod local;
mod remote;
mod sink;

pub use accumulator::{FlushPolicy, FocusAccumulator, FocusIncrement};
pub use local::LocalFocusSink;
pub use remote::RemoteFocusSink;
pub use sink::{dispatch_increment, FocusSink, NullSink, ReadModifyWriteSink, RecordingSink};

use std::sync::Arc;

use crate::error::Result;
use crate::storage::{Config, Database, SinkKind, SinkMode};

/// Build the sink described by `config`.
///
/// `open_local` is only called for the local sink. In `update` mode the sink
/// is wrapped so increments become read-modify-write updates.
pub fn sink_from_config(
    config: &Config,
    open_local: impl FnOnce() -> Result<Database>,
) -> Result<Arc<dyn FocusSink>> {
    let sink: Arc<dyn FocusSink> = match (config.sink.kind, config.focus.mode) {
        (SinkKind::None, _) => Arc::new(NullSink),
        (SinkKind::Local, SinkMode::Increment) => Arc::new(LocalFocusSink::new(open_local()?)),
        (SinkKind::Local, SinkMode::Update) => Arc::new(ReadModifyWriteSink::new(
            LocalFocusSink::new(open_local()?),
        )),
        (SinkKind::Remote, mode) => {
            let remote = RemoteFocusSink::new(&config.sink.url, config.sink.api_key.clone())?;
            match mode {
                SinkMode::Increment => Arc::new(remote),
                SinkMode::Update => Arc::new(ReadModifyWriteSink::new(remote)),
            }
        }
    };
    tracing::debug!(sink = sink.name(), mode = ?config.focus.mode, "focus sink ready");
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_kind() {
        let mut config = Config::default();
        let sink = sink_from_config(&config, Database::open_memory).unwrap();
        assert_eq!(sink.name(), "local");

        config.sink.kind = SinkKind::None;
        let sink = sink_from_config(&config, || panic!("local db not needed")).unwrap();
        assert_eq!(sink.name(), "none");

        config.sink.kind = SinkKind::Remote;
        config.sink.url = "https://abc.supabase.co".into();
        config.focus.mode = SinkMode::Update;
        let sink = sink_from_config(&config, || panic!("local db not needed")).unwrap();
        assert_eq!(sink.name(), "remote");
    }

    #[test]
    fn bad_remote_url_is_an_error() {
        let mut config = Config::default();
        config.sink.kind = SinkKind::Remote;
        config.sink.url = "::nope::".into();
        assert!(sink_from_config(&config, Database::open_memory).is_err());
    }
}
