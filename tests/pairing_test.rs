use std::collections::{BTreeMap, BTreeSet};
use subpair::{
    pair, DiscoveredFile, FileKind, MatchReason, PairingEngine, PairingOptions, PairingResult,
    TieBreak, ValidationError,
};

fn video(path: &str, size: u64) -> DiscoveredFile {
    DiscoveredFile::new(path, size, FileKind::Video)
}

fn subtitle(path: &str) -> DiscoveredFile {
    DiscoveredFile::new(path, 2_048, FileKind::Subtitle)
}

/// subtitle path -> matched video path
fn assignments(result: &PairingResult) -> BTreeMap<String, Option<String>> {
    let mut map = BTreeMap::new();
    for pair in &result.pairs {
        for sub in &pair.subtitles {
            map.insert(sub.full_path.clone(), Some(pair.video.full_path.clone()));
        }
    }
    for orphan in &result.orphans {
        map.insert(orphan.full_path.clone(), None);
    }
    map
}

fn mixed_batch() -> Vec<DiscoveredFile> {
    vec![
        video("Drop/Show.S01E01.720p.HDTV.x264-GRP.mkv", 500_000_000),
        video("Drop/Show.S01E02.720p.HDTV.x264-GRP.mkv", 510_000_000),
        subtitle("Drop/Show.S01E01.en.srt"),
        subtitle("Drop/Show.S01E02.en.srt"),
        subtitle("Drop/Show.S01E03.en.srt"),
        subtitle("Drop/Subs/Show.S01E02.fr.srt"),
        video("Movie/Movie.2020.1080p.mkv", 4_000_000_000),
        video("Movie/Sample/Movie.2020.sample.mkv", 20_000_000),
        subtitle("Movie/Movie.2020.srt"),
        subtitle("Other/Unrelated.srt"),
        DiscoveredFile::new("Movie/Movie.2020.nfo", 1_000, FileKind::Other),
    ]
}

#[test]
fn test_scenario_a_identical_stems() {
    let files = vec![
        video("Movie.2020.1080p.mkv", 1_000_000),
        subtitle("Movie.2020.1080p.srt"),
    ];
    let result = pair(&files).unwrap();

    assert_eq!(result.pairs.len(), 1);
    assert!(result.orphans.is_empty());
    assert_eq!(result.pairs[0].subtitles[0].full_path, "Movie.2020.1080p.srt");
    assert_eq!(result.decisions[0].reason, MatchReason::ExactName);
    assert_eq!(result.decisions[0].score, 1.0);
}

#[test]
fn test_scenario_b_mismatched_episode() {
    let files = vec![video("Show.S01E01.mkv", 1_000_000), subtitle("Show.S01E02.srt")];
    let result = pair(&files).unwrap();

    assert_eq!(result.pairs.len(), 1);
    assert!(result.pairs[0].subtitles.is_empty());
    assert_eq!(result.orphans.len(), 1);
    assert_eq!(result.orphans[0].full_path, "Show.S01E02.srt");

    let decision = &result.decisions[0];
    assert_eq!(decision.reason, MatchReason::BelowThreshold);
    assert_eq!(
        decision.candidate_video.as_ref().map(|v| v.full_path.as_str()),
        Some("Show.S01E01.mkv")
    );
    assert!(decision.score > 0.0 && decision.score < 0.6);
    assert!(!decision.is_matched());
}

#[test]
fn test_scenario_c_subs_folder() {
    let files = vec![
        video("A/Movie.mkv", 1_000_000),
        subtitle("A/Subs/Movie.en.srt"),
        subtitle("A/Subs/Movie.fr.srt"),
    ];
    let result = pair(&files).unwrap();

    assert_eq!(result.pairs.len(), 1);
    assert!(result.orphans.is_empty());
    let subs: Vec<&str> = result.pairs[0]
        .subtitles
        .iter()
        .map(|s| s.full_path.as_str())
        .collect();
    assert_eq!(subs, vec!["A/Subs/Movie.en.srt", "A/Subs/Movie.fr.srt"]);
}

#[test]
fn test_scenario_d_size_tie_break() {
    let files = vec![
        video("X/Movie.mkv", 100_000_000),
        video("Y/Movie.mkv", 900_000_000),
        subtitle("Movie.srt"),
    ];
    let result = pair(&files).unwrap();

    let decision = result.decision_for("Movie.srt").unwrap();
    assert_eq!(
        decision.candidate_video.as_ref().unwrap().full_path,
        "Y/Movie.mkv"
    );
    let ambiguity = decision.ambiguity.as_ref().expect("ambiguous match recorded");
    assert_eq!(ambiguity.runner_up, "X/Movie.mkv");
    assert_eq!(ambiguity.resolved_by, TieBreak::FileSize);
    assert_eq!(result.pair_for("Y/Movie.mkv").unwrap().subtitles.len(), 1);
}

#[test]
fn test_scenario_d_movie_guess_tie_break() {
    let files = vec![
        video("X/Movie.mkv", 100_000_000).with_movie_guess("tt0000001"),
        video("Y/Movie.mkv", 900_000_000).with_movie_guess("tt0000002"),
        subtitle("Movie.srt").with_movie_guess("tt0000001"),
    ];
    let result = pair(&files).unwrap();

    let decision = result.decision_for("Movie.srt").unwrap();
    assert_eq!(
        decision.candidate_video.as_ref().unwrap().full_path,
        "X/Movie.mkv"
    );
    let ambiguity = decision.ambiguity.as_ref().unwrap();
    assert_eq!(ambiguity.resolved_by, TieBreak::MovieGuess);
}

#[test]
fn test_scenario_e_empty_input() {
    let result = pair(&[]).unwrap();
    assert!(result.pairs.is_empty());
    assert!(result.orphans.is_empty());
    assert!(result.decisions.is_empty());
}

#[test]
fn test_scenario_f_duplicate_path() {
    let files = vec![
        video("Movie.mkv", 1),
        subtitle("Movie.srt"),
        video("Movie.mkv", 2),
    ];
    assert_eq!(
        pair(&files),
        Err(ValidationError::DuplicatePath("Movie.mkv".to_string()))
    );
}

#[test]
fn test_mixed_batch_outcome() {
    let result = pair(&mixed_batch()).unwrap();
    let map = assignments(&result);

    let expect = |sub: &str, video: Option<&str>| {
        assert_eq!(
            map.get(sub).cloned().flatten().as_deref(),
            video,
            "subtitle {}",
            sub
        );
    };
    expect(
        "Drop/Show.S01E01.en.srt",
        Some("Drop/Show.S01E01.720p.HDTV.x264-GRP.mkv"),
    );
    expect(
        "Drop/Show.S01E02.en.srt",
        Some("Drop/Show.S01E02.720p.HDTV.x264-GRP.mkv"),
    );
    expect(
        "Drop/Subs/Show.S01E02.fr.srt",
        Some("Drop/Show.S01E02.720p.HDTV.x264-GRP.mkv"),
    );
    expect("Drop/Show.S01E03.en.srt", None);
    expect("Movie/Movie.2020.srt", Some("Movie/Movie.2020.1080p.mkv"));
    expect("Other/Unrelated.srt", None);

    // the sample still gets a pair of its own
    assert_eq!(result.pairs.len(), 4);
    assert!(result
        .pair_for("Movie/Sample/Movie.2020.sample.mkv")
        .unwrap()
        .subtitles
        .is_empty());
}

#[test]
fn test_every_subtitle_in_exactly_one_place() {
    let files = mixed_batch();
    let result = pair(&files).unwrap();

    let mut seen = BTreeSet::new();
    for pair in &result.pairs {
        assert_eq!(pair.video.kind, FileKind::Video);
        for sub in &pair.subtitles {
            assert_eq!(sub.kind, FileKind::Subtitle);
            assert!(seen.insert(sub.full_path.clone()), "{} twice", sub.full_path);
        }
    }
    for orphan in &result.orphans {
        assert!(seen.insert(orphan.full_path.clone()), "{} twice", orphan.full_path);
    }

    let subtitles: BTreeSet<String> = files
        .iter()
        .filter(|f| f.kind == FileKind::Subtitle)
        .map(|f| f.full_path.clone())
        .collect();
    assert_eq!(seen, subtitles);

    let videos = files.iter().filter(|f| f.kind == FileKind::Video).count();
    assert_eq!(result.pairs.len(), videos);
    assert_eq!(result.decisions.len(), subtitles.len());
}

#[test]
fn test_pairing_is_idempotent() {
    let files = mixed_batch();
    let first = pair(&files).unwrap();
    let second = pair(&files).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_input_order_does_not_change_matches() {
    let files = mixed_batch();
    let expected = assignments(&pair(&files).unwrap());

    let mut reversed = files.clone();
    reversed.reverse();
    assert_eq!(assignments(&pair(&reversed).unwrap()), expected);

    for shift in 1..files.len() {
        let mut rotated = files.clone();
        rotated.rotate_left(shift);
        assert_eq!(
            assignments(&pair(&rotated).unwrap()),
            expected,
            "rotation by {}",
            shift
        );
    }

    // ties with equal scores are settled the same way too
    let tie = vec![
        video("X/Movie.mkv", 500),
        video("Y/Movie.mkv", 500),
        subtitle("Movie.srt"),
    ];
    let mut tie_reversed = tie.clone();
    tie_reversed.reverse();
    assert_eq!(
        assignments(&pair(&tie).unwrap()),
        assignments(&pair(&tie_reversed).unwrap())
    );
}

#[test]
fn test_lower_threshold_only_adds_matches() {
    let files = mixed_batch();
    let thresholds = [1.0, 0.95, 0.9, 0.75, 0.6, 0.4, 0.2, 0.1, 0.0];

    let mut previous: Option<BTreeMap<String, Option<String>>> = None;
    for threshold in thresholds {
        let engine = PairingEngine::new(PairingOptions {
            min_similarity: threshold,
            ..Default::default()
        });
        let current = assignments(&engine.pair(&files).unwrap());
        if let Some(previous) = &previous {
            for (sub, video) in previous {
                if video.is_some() {
                    assert_eq!(
                        current.get(sub),
                        Some(video),
                        "{} moved at threshold {}",
                        sub,
                        threshold
                    );
                }
            }
        }
        previous = Some(current);
    }
}

#[test]
fn test_zero_threshold_matches_every_reachable_subtitle() {
    let engine = PairingEngine::new(PairingOptions {
        min_similarity: 0.0,
        ..Default::default()
    });
    let result = engine.pair(&mixed_batch()).unwrap();
    for decision in &result.decisions {
        assert_eq!(
            decision.is_matched(),
            decision.candidate_video.is_some(),
            "{}",
            decision.subtitle.full_path
        );
    }
}

#[test]
fn test_fallback_depth_widens_search() {
    let files = vec![
        video("Release/Movie.2020.mkv", 1_000),
        subtitle("Release/Subs/English/Movie.2020.srt"),
    ];
    let shallow = pair(&files).unwrap();
    assert_eq!(shallow.orphans.len(), 1);
    assert_eq!(shallow.decisions[0].reason, MatchReason::NoCandidate);

    let engine = PairingEngine::new(PairingOptions {
        fallback_depth: 2,
        ..Default::default()
    });
    let deep = engine.pair(&files).unwrap();
    assert!(deep.orphans.is_empty());
    assert_eq!(deep.pairs[0].subtitles.len(), 1);
}

#[test]
fn test_repair_applies_late_metadata() {
    let engine = PairingEngine::default();
    let files = vec![
        video("X/Movie.mkv", 100_000_000),
        video("Y/Movie.mkv", 900_000_000),
        subtitle("Movie.srt"),
    ];
    let initial = engine.pair(&files).unwrap();
    assert_eq!(
        initial.decisions[0].candidate_video.as_ref().unwrap().full_path,
        "Y/Movie.mkv"
    );

    let updates = vec![
        subtitle("Movie.srt").with_movie_guess("tt0000001"),
        video("X/Movie.mkv", 100_000_000).with_movie_guess("tt0000001"),
        video("Y/Movie.mkv", 900_000_000).with_movie_guess("tt0000002"),
    ];
    let repaired = engine.repair(&initial, &updates).unwrap();
    assert_eq!(
        repaired.decisions[0].candidate_video.as_ref().unwrap().full_path,
        "X/Movie.mkv"
    );
    assert_eq!(
        repaired.pair_for("X/Movie.mkv").unwrap().subtitles[0].movie_guess.as_deref(),
        Some("tt0000001")
    );

    // same as pairing the enriched batch from scratch
    let fresh = vec![updates[1].clone(), updates[2].clone(), updates[0].clone()];
    assert_eq!(repaired, engine.pair(&fresh).unwrap());
}

#[test]
fn test_repair_rejects_unknown_and_repeated_files() {
    let engine = PairingEngine::default();
    let initial = engine
        .pair(&[video("Movie.mkv", 1), subtitle("Movie.srt")])
        .unwrap();

    assert_eq!(
        engine.repair(&initial, &[subtitle("Other.srt")]),
        Err(ValidationError::UnknownFile("Other.srt".to_string()))
    );
    assert_eq!(
        engine.repair(&initial, &[subtitle("Movie.srt"), subtitle("Movie.srt")]),
        Err(ValidationError::DuplicatePath("Movie.srt".to_string()))
    );
}

#[test]
fn test_malformed_path_rejected() {
    let files = vec![video("A//Movie.mkv", 1)];
    assert!(matches!(
        pair(&files),
        Err(ValidationError::MalformedPath { .. })
    ));
}

#[test]
fn test_result_serializes_without_inputs() {
    let result = pair(&[video("Movie.mkv", 1), subtitle("Movie.en.srt")]).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("inputs").is_none());
    assert_eq!(json["decisions"][0]["reason"], "exact-name");
    assert_eq!(json["pairs"][0]["subtitles"][0]["full_path"], "Movie.en.srt");
}

#[test]
fn test_video_in_subfolder_reaches_parent_subtitle() {
    let files = vec![
        video("Other.Film.mkv", 700_000_000),
        subtitle("Movie.2020.srt"),
        video("Movie.2020/Movie.2020.mkv", 4_000_000_000),
    ];
    let result = pair(&files).unwrap();

    let decision = result.decision_for("Movie.2020.srt").unwrap();
    assert_eq!(decision.reason, MatchReason::ExactName);
    assert_eq!(
        decision.candidate_video.as_ref().unwrap().full_path,
        "Movie.2020/Movie.2020.mkv"
    );
    assert!(result.orphans.is_empty());
    assert!(result.pair_for("Other.Film.mkv").unwrap().subtitles.is_empty());
}

#[test]
fn test_weak_local_video_does_not_hide_sibling_match() {
    let files = vec![
        video("Pack/Extras/Featurette.mkv", 50_000_000),
        subtitle("Pack/Extras/Movie.2020.srt"),
        video("Pack/Feature/Movie.2020.mkv", 4_000_000_000),
    ];
    let result = pair(&files).unwrap();

    let decision = result.decision_for("Pack/Extras/Movie.2020.srt").unwrap();
    assert_eq!(
        decision.candidate_video.as_ref().unwrap().full_path,
        "Pack/Feature/Movie.2020.mkv"
    );
}

#[test]
fn test_sibling_directory_fallback() {
    let files = vec![video("A/y/Movie.mkv", 1_000), subtitle("A/x/Movie.srt")];
    let result = pair(&files).unwrap();

    assert!(result.orphans.is_empty());
    assert_eq!(result.decisions[0].reason, MatchReason::ExactName);
    assert_eq!(result.pair_for("A/y/Movie.mkv").unwrap().subtitles.len(), 1);
}

#[test]
fn test_co_located_pairs_do_not_cross_directories() {
    // both folders hold a video and a subtitle, so neither side widens
    let files = vec![
        video("A/Movie.mkv", 1_000),
        subtitle("A/Other.srt"),
        video("A/Sub/Other.mkv", 1_000),
        subtitle("A/Sub/Movie.srt"),
    ];
    let result = pair(&files).unwrap();
    assert_eq!(result.orphans.len(), 2);
}

#[test]
fn test_orphan_records_ambiguity() {
    let files = vec![
        video("Show.S01E01.mkv", 1_000),
        video("Show.S01E02.mkv", 1_000),
        subtitle("Show.S01E03.srt"),
    ];
    let result = pair(&files).unwrap();

    assert_eq!(result.orphans.len(), 1);
    let decision = &result.decisions[0];
    assert_eq!(decision.reason, MatchReason::BelowThreshold);
    let ambiguity = decision.ambiguity.as_ref().expect("close runner-up recorded");
    assert_eq!(ambiguity.runner_up, "Show.S01E02.mkv");
    assert_eq!(ambiguity.runner_up_score, decision.score);
    assert_eq!(ambiguity.resolved_by, TieBreak::PathOrder);
}

#[test]
fn test_zip_subs_folder_counts_as_subs_folder() {
    let files = vec![
        video("A/Movie.mkv", 1_000),
        DiscoveredFile::new("A/Movie.zip", 500, FileKind::Archive),
        subtitle("A/Movie.zip/Subs/Movie.en.srt"),
    ];
    let result = pair(&files).unwrap();
    assert!(result.orphans.is_empty());
    assert_eq!(result.decisions[0].reason, MatchReason::ExactName);

    // same without the archive itself in the batch
    let result = pair(&[video("A/Movie.mkv", 1_000), subtitle("A/Movie.zip/Subs/Movie.en.srt")])
        .unwrap();
    assert!(result.orphans.is_empty());
}

#[test]
fn test_leading_slash_duplicate_rejected() {
    let files = vec![video("/A/Movie.mkv", 1), subtitle("A/Movie.srt"), video("A/Movie.mkv", 1)];
    assert!(matches!(
        pair(&files),
        Err(ValidationError::DuplicatePath(_))
    ));
}
