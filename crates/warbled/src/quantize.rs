//! Elapsed-time to duration-bucket quantization.

/// Bucket for an inter-onset interval of `elapsed` seconds.
///
/// Intervals longer than `max_duration` reuse `oldest_bucket`, the oldest
/// entry of the duration window at call time. Everything else maps to
/// `floor(elapsed / unit)`, clamped into the alphabet.
pub fn quantize_elapsed(
    elapsed: f64,
    max_duration: f64,
    divisions: usize,
    oldest_bucket: usize,
) -> usize {
    if elapsed > max_duration {
        return oldest_bucket;
    }
    let last = divisions.saturating_sub(1);
    let unit = max_duration / divisions as f64;
    let bucket = (elapsed.max(0.0) / unit).floor();
    // `as` saturates for out-of-range floats; the min keeps elapsed ==
    // max_duration in the last bucket.
    (bucket as usize).min(last)
}

/// Same as [`quantize_elapsed`], reading the parameters from a live model.
pub fn quantize_for(model: &warble::SequenceModel, elapsed: f64) -> usize {
    let oldest = model.times().window().oldest().unwrap_or(0);
    quantize_elapsed(elapsed, model.max_duration(), model.divisions(), oldest)
}
