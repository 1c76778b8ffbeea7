use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("llm_chat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("llm_chat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("llm_chat.client.request_duration_seconds");

pub(crate) static STREAM_FRAMES: Counter = Counter::new("llm_chat.stream.frames");
pub(crate) static STREAM_BYTES: Counter = Counter::new("llm_chat.stream.bytes");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("llm_chat.stream.errors");
pub(crate) static STREAM_CANCELLATIONS: Counter = Counter::new("llm_chat.stream.cancellations");
pub(crate) static STREAM_DURATION: Moments = Moments::new("llm_chat.stream.duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_FRAMES);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_CANCELLATIONS);
    collector.register_moments(&STREAM_DURATION);
}
