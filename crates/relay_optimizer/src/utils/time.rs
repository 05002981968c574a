/// Runs `$block`, logs how long it took at debug level and returns its value.
#[macro_export]
macro_rules! timer_debug {
    ($msg:literal, $block:expr) => {{
        let started_at = jiff::Timestamp::now();
        let result = $block;
        let elapsed = jiff::Timestamp::now().duration_since(started_at);

        tracing::debug!(?elapsed, "{} finished", $msg);

        result
    }};
}
