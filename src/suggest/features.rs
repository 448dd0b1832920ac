use crate::profile::GenreProfile;

/// Number of scalar descriptors leading every feature vector.
pub const SCALAR_COUNT: usize = 9;

pub fn expected_len(vocabulary_len: usize, band_count: usize) -> usize {
    SCALAR_COUNT + vocabulary_len + 2 * band_count
}

/// Rescale `values` to [0, 1] using their own min and max. A set with no
/// spread maps to all zeros.
pub fn normalize_min_max(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        log::warn!(
            "All {} descriptors equal {}, normalizing to zeros",
            values.len(),
            min
        );
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

pub fn one_hot(genre: &str, vocabulary: &[String]) -> Vec<f64> {
    vocabulary
        .iter()
        .map(|g| if g == genre { 1.0 } else { 0.0 })
        .collect()
}

/// Model input for `profile`: normalized scalars, genre one-hot, mid
/// spectrum, side spectrum.
pub fn encode_profile(profile: &GenreProfile, vocabulary: &[String]) -> Vec<f64> {
    let mut features = Vec::with_capacity(expected_len(vocabulary.len(), profile.band_count()));
    features.extend(normalize_min_max(&profile.scalar_descriptors()));
    features.extend(one_hot(&profile.genre, vocabulary));
    features.extend_from_slice(&profile.simplified_spectrum_mid);
    features.extend_from_slice(&profile.simplified_spectrum_side);
    log::debug!(
        "Encoded '{}' into {} features ({} genres, {} bands)",
        profile.genre,
        features.len(),
        vocabulary.len(),
        profile.band_count()
    );
    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenreConfig;
    use crate::profile::document::tests::sample_profile;

    fn vocabulary() -> Vec<String> {
        GenreConfig::default().focus
    }

    #[test]
    fn length_is_fixed_for_any_genre() {
        let vocab = vocabulary();
        for genre in ["Pop", "Piano", "Shoegaze", ""] {
            let features = encode_profile(&sample_profile(genre), &vocab);
            assert_eq!(features.len(), expected_len(10, 10));
            assert_eq!(features.len(), 39);
        }
    }

    #[test]
    fn pop_sets_first_one_hot_slot() {
        let features = encode_profile(&sample_profile("Pop"), &vocabulary());
        let hot = &features[SCALAR_COUNT..SCALAR_COUNT + 10];
        assert_eq!(hot[0], 1.0);
        assert_eq!(hot.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn unknown_genre_has_no_hot_slot() {
        let features = encode_profile(&sample_profile("Vaporwave"), &vocabulary());
        assert!(features[SCALAR_COUNT..SCALAR_COUNT + 10].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn scalars_are_normalized_against_themselves() {
        let profile = sample_profile("Rock");
        let features = encode_profile(&profile, &vocabulary());
        let scalars = &features[..SCALAR_COUNT];
        // lufs is the smallest value and spectral_bandwidth the largest
        assert_eq!(scalars[6], 0.0);
        assert_eq!(scalars[8], 1.0);
        let expected = (0.21 - -11.3) / (2810.2 - -11.3);
        assert!((scalars[0] - expected).abs() < 1e-12);
        assert!(scalars.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn spectra_follow_one_hot() {
        let profile = sample_profile("EDM");
        let features = encode_profile(&profile, &vocabulary());
        let start = SCALAR_COUNT + 10;
        assert_eq!(&features[start..start + 10], profile.simplified_spectrum_mid.as_slice());
        assert_eq!(&features[start + 10..], profile.simplified_spectrum_side.as_slice());
    }

    #[test]
    fn flat_scalars_become_zeros() {
        assert_eq!(normalize_min_max(&[0.4; 9]), vec![0.0; 9]);
        assert!(normalize_min_max(&[]).is_empty());
        assert_eq!(normalize_min_max(&[1.0, 3.0, 2.0]), vec![0.0, 1.0, 0.5]);
    }
}
