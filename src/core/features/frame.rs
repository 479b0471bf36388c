//! Fixed-duration clip normalization

/// Force a buffer to exactly `target_len` samples.
///
/// Shorter input is right-padded with silence; longer input keeps its first
/// `target_len` samples. No centering or energy alignment.
pub fn normalize_length<T: Copy + Default>(samples: &[T], target_len: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(target_len);
    out.extend_from_slice(&samples[..samples.len().min(target_len)]);
    out.resize(target_len, T::default());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_half_second_is_padded_with_silence() {
        let half: Vec<i16> = (0..8000).map(|i| (i % 200 + 1) as i16).collect();
        let out = normalize_length(&half, 16_000);
        assert_eq!(out.len(), 16_000);
        assert_eq!(&out[..8000], &half[..]);
        assert!(out[8000..].iter().all(|&s| s == 0));
    }

    #[test]
    fn test_long_clip_keeps_leading_window() {
        let long: Vec<i16> = (0..24_000).map(|i| (i % 3000) as i16).collect();
        let out = normalize_length(&long, 16_000);
        assert_eq!(out, long[..16_000].to_vec());
    }

    #[test]
    fn test_exact_length_unchanged() {
        let exact = vec![7i16; 16_000];
        assert_eq!(normalize_length(&exact, 16_000), exact);
    }

    proptest! {
        #[test]
        fn prop_length_and_prefix(samples in proptest::collection::vec(any::<i16>(), 0..4000), target in 0usize..4000) {
            let out = normalize_length(&samples, target);
            prop_assert_eq!(out.len(), target);
            let kept = samples.len().min(target);
            prop_assert_eq!(&out[..kept], &samples[..kept]);
            prop_assert!(out[kept..].iter().all(|&s| s == 0));
        }
    }
}
