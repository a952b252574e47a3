use std::sync::{
    Arc,
    Mutex,
};

use psa_core::TrackInfo;

use super::*;

#[derive(Default, Clone)]
struct Recording(Arc<Mutex<Vec<ListenRecord>>>);

#[async_trait]
impl ListenSink for Recording {
    fn name(&self) -> &'static str { "recording" }

    async fn submit(&self, listen: &ListenRecord) -> Result<(), SubmitError> {
        self.0.lock().unwrap().push(listen.clone());
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl ListenSink for Failing {
    fn name(&self) -> &'static str { "failing" }

    async fn submit(&self, _listen: &ListenRecord) -> Result<(), SubmitError> { Err(SubmitError::MissingField("artist")) }
}

struct Panicking;

#[async_trait]
impl ListenSink for Panicking {
    fn name(&self) -> &'static str { "panicking" }

    async fn submit(&self, _listen: &ListenRecord) -> Result<(), SubmitError> { panic!("boom") }
}

fn sink(sink: impl ListenSink + 'static) -> Box<dyn ListenSink> { Box::new(sink) }

fn listen(status: ListenStatus) -> ListenRecord {
    let track = TrackInfo {
        artist: Some("Artist A".to_owned()),
        track_title: Some("Song A".to_owned()),
        ..Default::default()
    };
    ListenRecord::new(status, track, 1_700_000_000)
}

#[tokio::test]
async fn failures_are_isolated() {
    let recording = Recording::default();
    let dispatcher = Dispatcher::new(vec![sink(Failing), sink(Panicking), sink(recording.clone())]);

    let report = dispatcher.dispatch(&listen(ListenStatus::Scrobbled)).await;

    assert_eq!(report, DispatchReport {
        submitted: vec!["recording"],
        failed: vec!["failing", "panicking"],
    });
    assert_eq!(*recording.0.lock().unwrap(), [listen(ListenStatus::Scrobbled)]);
}

#[tokio::test]
async fn every_sink_sees_the_same_listen() {
    let first = Recording::default();
    let second = Recording::default();
    let dispatcher = Dispatcher::new(vec![sink(first.clone()), sink(second.clone())]);

    dispatcher.dispatch(&listen(ListenStatus::Playing)).await;

    assert_eq!(*first.0.lock().unwrap(), *second.0.lock().unwrap());
    assert_eq!(first.0.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn stopped_listens_are_not_dispatched() {
    let recording = Recording::default();
    let dispatcher = Dispatcher::new(vec![sink(recording.clone())]);

    let report = dispatcher.dispatch(&listen(ListenStatus::Stopped)).await;

    assert_eq!(report, DispatchReport::default());
    assert!(recording.0.lock().unwrap().is_empty());
}

#[test]
fn lists_sinks() {
    let dispatcher = Dispatcher::new(vec![sink(Failing), sink(Panicking)]);
    assert_eq!(dispatcher.sink_names().collect::<Vec<_>>(), ["failing", "panicking"]);
    assert_eq!(Dispatcher::default().sink_names().count(), 0);
}
