use jiff::SpanRelativeTo;
use relay_optimizer::solver::construction::construct_solution::FirstSolutionStrategy;

/// Accepts "30s", "PT1M30S", "5m" or a plain number of seconds.
pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds));
    }

    Err(format!("invalid duration: {input}"))
}

pub fn parse_strategy(input: &str) -> Result<FirstSolutionStrategy, String> {
    serde_json::from_value(serde_json::Value::String(input.replace('-', "_")))
        .map_err(|_| format!("unknown strategy {input}, expected cheapest-arc, nearest-neighbor or savings"))
}
