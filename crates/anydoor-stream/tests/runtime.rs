//! Stream runtime behaviour against scripted chunk sources, on a paused clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anydoor_stream::{
    open, ChunkSource, ChunkStream, Stage, StreamError, StreamEvent, StreamOptions, StreamRequest,
    StreamSlot,
};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum Step {
    Chunk(String),
    Wait(Duration),
    Fail(u16, &'static str),
}

#[derive(Clone)]
struct Scripted {
    steps: Vec<Step>,
    dropped: Arc<AtomicBool>,
}

impl Scripted {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl ChunkSource for Scripted {
    fn open(&self, _request: &StreamRequest) -> BoxFuture<'static, Result<ChunkStream, StreamError>> {
        let steps = self.steps.clone();
        let guard = DropFlag(Arc::clone(&self.dropped));
        async move {
            let stream = futures::stream::iter(steps)
                .then(|step| async move {
                    match step {
                        Step::Chunk(text) => Some(Ok(Bytes::from(text))),
                        Step::Wait(duration) => {
                            tokio::time::sleep(duration).await;
                            None
                        }
                        Step::Fail(status, body) => Some(Err(StreamError::UpstreamStatus {
                            status,
                            body: body.to_owned(),
                        })),
                    }
                })
                .filter_map(futures::future::ready)
                .map(move |item| {
                    let _keep_alive = &guard;
                    item
                });
            Ok(stream.boxed())
        }
        .boxed()
    }
}

/// Holds back the response for `delay` before yielding one chunk.
struct SlowToConnect {
    delay: Duration,
}

impl ChunkSource for SlowToConnect {
    fn open(&self, _request: &StreamRequest) -> BoxFuture<'static, Result<ChunkStream, StreamError>> {
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            let stream = futures::stream::iter(vec![Ok(Bytes::from_static(b"late\n"))]);
            Ok(stream.boxed())
        }
        .boxed()
    }
}

struct RefusesToConnect;

impl ChunkSource for RefusesToConnect {
    fn open(&self, _request: &StreamRequest) -> BoxFuture<'static, Result<ChunkStream, StreamError>> {
        async {
            Err(StreamError::UpstreamStatus {
                status: 500,
                body: r#"{"error":"configuration_error","message":"GENERATION_API_KEY is not set"}"#
                    .to_owned(),
            })
        }
        .boxed()
    }
}

fn request() -> StreamRequest {
    StreamRequest::new("/autumn/leaves", "Mozilla/5.0")
}

fn delta(content: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

fn chunk(text: &str) -> Step {
    Step::Chunk(text.to_owned())
}

async fn collect(handle: &mut anydoor_stream::StreamHandle) -> Vec<(Instant, StreamEvent)> {
    let mut events = Vec::new();
    while let Some(event) = handle.next().await {
        events.push((Instant::now(), event));
    }
    events
}

fn snapshot(event: &StreamEvent) -> &anydoor_stream::StreamSnapshot {
    match event {
        StreamEvent::Snapshot(snapshot) => snapshot,
        StreamEvent::Failed { message } => panic!("unexpected failure: {message}"),
    }
}

#[tokio::test(start_paused = true)]
async fn burst_of_chunks_yields_first_and_final_snapshot() {
    let source = Scripted::new(vec![
        Step::Chunk(delta("<html>")),
        Step::Chunk(delta("<head></head>")),
        Step::Chunk(delta("<body>hi</body>")),
        Step::Chunk(delta("</html>")),
        chunk("data: [DONE]\n"),
    ]);

    let mut handle = open(&source, &request(), StreamOptions::default());
    let events = collect(&mut handle).await;

    assert_eq!(events.len(), 2);
    let first = snapshot(&events[0].1);
    assert_eq!(&*first.content, "<html>");
    assert_eq!(first.stage, Stage::Designing);

    let last = snapshot(&events[1].1);
    assert_eq!(&*last.content, "<html><head></head><body>hi</body></html>");
    assert_eq!(last.stage, Stage::Complete);
    assert_eq!(last.sequence, 2);
}

#[tokio::test(start_paused = true)]
async fn snapshots_respect_flush_interval() {
    let ms = Duration::from_millis;
    let source = Scripted::new(vec![
        chunk("a\n"),
        Step::Wait(ms(100)),
        chunk("b\n"),
        Step::Wait(ms(100)),
        chunk("c\n"),
        Step::Wait(ms(200)),
        chunk("d\n"),
        Step::Wait(ms(50)),
    ]);

    let start = Instant::now();
    let mut handle = open(&source, &request(), StreamOptions::default());
    let events = collect(&mut handle).await;

    let contents: Vec<&str> = events.iter().map(|(_, e)| &*snapshot(e).content).collect();
    assert_eq!(contents, vec!["a", "abc", "abcd"]);

    let offsets: Vec<Duration> = events.iter().map(|(at, _)| *at - start).collect();
    assert_eq!(offsets[0], ms(0));
    assert_eq!(offsets[1], ms(300));
    assert_eq!(offsets[2], ms(450));

    // Only the terminal snapshot may follow its predecessor within the interval.
    for pair in events[..events.len() - 1].windows(2) {
        assert!(pair[1].0 - pair[0].0 >= ms(300));
    }
    assert_eq!(snapshot(&events[2].1).stage, Stage::Complete);
}

#[tokio::test(start_paused = true)]
async fn stage_moves_to_structuring_on_third_marker_chunk() {
    let ms = Duration::from_millis;
    let source = Scripted::new(vec![
        Step::Chunk(delta("<html>")),
        Step::Wait(ms(400)),
        Step::Chunk(delta("<head>")),
        Step::Wait(ms(400)),
        Step::Chunk(delta("<body>")),
        Step::Wait(ms(400)),
    ]);

    let mut handle = open(&source, &request(), StreamOptions::default());
    let events = collect(&mut handle).await;
    let stages: Vec<Stage> = events.iter().map(|(_, e)| snapshot(e).stage).collect();

    assert_eq!(
        stages,
        vec![
            Stage::Designing,
            Stage::Designing,
            Stage::Structuring,
            Stage::Complete
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn trailing_unterminated_line_is_kept() {
    let source = Scripted::new(vec![chunk("<p>one</p>\n<p>tw"), chunk("o</p>")]);
    let mut handle = open(&source, &request(), StreamOptions::default());
    let events = collect(&mut handle).await;
    let last = snapshot(&events.last().expect("events").1);
    assert_eq!(&*last.content, "<p>one</p><p>two</p>");
    assert_eq!(last.stage, Stage::Complete);
}

#[tokio::test(start_paused = true)]
async fn upstream_error_fails_without_completing() {
    let source = Scripted::new(vec![
        Step::Chunk(delta("<html>")),
        Step::Fail(502, "bad gateway"),
    ]);
    let mut handle = open(&source, &request(), StreamOptions::default());
    let events = collect(&mut handle).await;

    assert_eq!(events.len(), 2);
    assert_eq!(&*snapshot(&events[0].1).content, "<html>");
    assert_eq!(
        events[1].1,
        StreamEvent::Failed {
            message: "bad gateway".to_owned()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn connect_failure_surfaces_upstream_message() {
    let mut handle = open(&RefusesToConnect, &request(), StreamOptions::default());
    let events = collect(&mut handle).await;
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].1,
        StreamEvent::Failed {
            message: "GENERATION_API_KEY is not set".to_owned()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_delivery_and_releases_upstream() {
    let source = Scripted::new(vec![
        chunk("first\n"),
        Step::Wait(Duration::from_secs(10)),
        chunk("second\n"),
    ]);
    let mut handle = open(&source, &request(), StreamOptions::default());

    let first = handle.next().await.expect("first snapshot");
    assert_eq!(&*snapshot(&first).content, "first");

    handle.cancel();
    assert!(handle.is_cancelled());
    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(handle.next().await, None);

    wait_for(&source.dropped).await;
}

#[tokio::test(start_paused = true)]
async fn idle_timeout_fails_stalled_stream() {
    let source = Scripted::new(vec![
        chunk("<html>\n"),
        Step::Wait(Duration::from_secs(60)),
        chunk("never\n"),
    ]);
    let options = StreamOptions {
        idle_timeout: Some(Duration::from_secs(5)),
        ..StreamOptions::default()
    };
    let mut handle = open(&source, &request(), options);
    let events = collect(&mut handle).await;

    assert_eq!(events.len(), 2);
    match &events[1].1 {
        StreamEvent::Failed { message } => assert!(message.contains("no data received")),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn idle_timeout_covers_waiting_for_response() {
    let source = SlowToConnect {
        delay: Duration::from_secs(600),
    };
    let options = StreamOptions {
        idle_timeout: Some(Duration::from_secs(5)),
        ..StreamOptions::default()
    };
    let started = Instant::now();
    let mut handle = open(&source, &request(), options);
    let events = collect(&mut handle).await;

    assert_eq!(events.len(), 1);
    let (at, event) = &events[0];
    match event {
        StreamEvent::Failed { message } => assert!(message.contains("no data received")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(at.duration_since(started), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn slow_response_within_idle_timeout_still_completes() {
    let source = SlowToConnect {
        delay: Duration::from_secs(3),
    };
    let options = StreamOptions {
        idle_timeout: Some(Duration::from_secs(5)),
        ..StreamOptions::default()
    };
    let mut handle = open(&source, &request(), options);
    let events = collect(&mut handle).await;

    let last = snapshot(&events.last().expect("events").1);
    assert_eq!(last.stage, Stage::Complete);
    assert_eq!(&*last.content, "late");
}

#[tokio::test(start_paused = true)]
async fn slot_replaces_previous_stream() {
    let slow = Scripted::new(vec![
        chunk("slow\n"),
        Step::Wait(Duration::from_secs(60)),
        chunk("late\n"),
    ]);
    let fast = Scripted::new(vec![chunk("fast\n")]);

    let mut slot = StreamSlot::new();
    slot.open(&slow, &request(), StreamOptions::default());
    let handle = slot.open(&fast, &request(), StreamOptions::default());
    let events = collect(handle).await;

    let contents: Vec<&str> = events.iter().map(|(_, e)| &*snapshot(e).content).collect();
    assert_eq!(contents, vec!["fast", "fast"]);
    wait_for(&slow.dropped).await;

    assert!(slot.cancel());
    assert!(!slot.cancel());
    assert!(slot.current().is_none());
}

async fn wait_for(flag: &AtomicBool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !flag.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("upstream stream should be dropped");
}
