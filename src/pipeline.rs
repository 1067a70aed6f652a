//! Pipeline orchestration
//!
//! This module provides the public API for Blink Morse. It wires the stages
//! together: sampler → classifier → assembler → codec → word session.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assembler::{LetterAssembler, LetterOutcome, SymbolOutcome};
use crate::classifier::SymbolClassifier;
use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::sampler::BlinkSampler;
use crate::schema::{RecordBody, StreamAdapter, StreamRecord};
use crate::session::WordSession;
use crate::types::{symbols_to_string, DecoderEvent, Millis, Observation, Symbol};

/// Decode a batch of observations (stateless, one-shot).
///
/// A letter or word still in progress at the end of the batch is dropped.
///
/// # Example
/// ```ignore
/// let events = decode_observations(DecoderConfig::default(), &observations)?;
/// ```
pub fn decode_observations(
    config: DecoderConfig,
    observations: &[Observation],
) -> Result<Vec<DecoderEvent>, DecodeError> {
    let mut decoder = BlinkDecoder::new(config)?;
    let mut events = Vec::new();
    for obs in observations {
        events.extend(decoder.observe(obs.t_ms, obs.eyes_closed)?);
    }
    Ok(events)
}

/// Decode blink.stream.v1 NDJSON (stateless, one-shot)
pub fn decode_stream_ndjson(
    config: DecoderConfig,
    ndjson: &str,
) -> Result<Vec<DecoderEvent>, DecodeError> {
    let records = StreamAdapter::parse_ndjson(ndjson)?;
    let mut decoder = BlinkDecoder::new(config)?;
    let mut events = Vec::new();
    for record in &records {
        events.extend(decoder.apply(record)?);
    }
    Ok(events)
}

/// Running counters over a decoder's lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderStats {
    /// Completed closed-eye intervals
    pub blinks: u64,
    pub dots: u64,
    pub dashes: u64,
    pub toggles: u64,
    /// Letters appended to words (placeholders included)
    pub letters: u64,
    /// Letters that fell back to the placeholder
    pub unknown_letters: u64,
    /// Letters dropped without decoding
    pub discarded_letters: u64,
    pub words: u64,
}

/// Stateful decoder for a single ordered stream of observations and ticks.
///
/// Timestamps must be non-decreasing across `observe` and `tick`. A
/// rejected timestamp leaves the decoder exactly as it was.
pub struct BlinkDecoder {
    config: DecoderConfig,
    sampler: BlinkSampler,
    classifier: SymbolClassifier,
    assembler: LetterAssembler,
    session: WordSession,
    last_ms: Option<Millis>,
    stats: DecoderStats,
}

impl BlinkDecoder {
    /// Create a decoder; fails fast on an invalid configuration
    pub fn new(config: DecoderConfig) -> Result<Self, DecodeError> {
        let classifier = SymbolClassifier::from_config(&config)?;
        let assembler = LetterAssembler::new(&config);
        Ok(Self {
            config,
            sampler: BlinkSampler::new(),
            classifier,
            assembler,
            session: WordSession::new(),
            last_ms: None,
            stats: DecoderStats::default(),
        })
    }

    /// Feed one eye-state sample
    pub fn observe(&mut self, t_ms: Millis, eyes_closed: bool) -> Result<Vec<DecoderEvent>, DecodeError> {
        self.advance_clock(t_ms)?;

        // A letter gap that elapsed before this sample closes first
        let mut events = Vec::new();
        self.idle_check(t_ms, &mut events);

        if let Some(blink) = self.sampler.observe(t_ms, eyes_closed) {
            self.stats.blinks += 1;
            let symbol = self.classifier.classify(blink.duration_ms);
            match symbol {
                Symbol::Dot => self.stats.dots += 1,
                Symbol::Dash => self.stats.dashes += 1,
                Symbol::WordToggle => self.stats.toggles += 1,
            }
            let outcome = self.assembler.on_symbol(symbol, blink.end_ms, &mut self.session);
            if let SymbolOutcome::Toggled {
                pending,
                completed_word,
            } = outcome
            {
                if let Some(letter) = pending {
                    self.record_letter(letter, t_ms, &mut events);
                }
                if let Some(word) = completed_word {
                    self.stats.words += 1;
                    events.push(DecoderEvent::WordCompleted { word, at_ms: t_ms });
                }
            }
        }

        Ok(events)
    }

    /// Run the letter-gap check without a new sample
    pub fn tick(&mut self, now_ms: Millis) -> Result<Vec<DecoderEvent>, DecodeError> {
        self.advance_clock(now_ms)?;
        let mut events = Vec::new();
        self.idle_check(now_ms, &mut events);
        Ok(events)
    }

    /// Apply one blink.stream.v1 record
    pub fn apply(&mut self, record: &StreamRecord) -> Result<Vec<DecoderEvent>, DecodeError> {
        record
            .validate()
            .map_err(|e| DecodeError::ParseError(format!("Invalid record: {}", e)))?;
        match record.body {
            RecordBody::Observation { t_ms, eyes_closed } => self.observe(t_ms, eyes_closed),
            RecordBody::Tick { t_ms } => self.tick(t_ms),
        }
    }

    /// Stop decoding; any partial letter or word is dropped
    pub fn finish(self) -> DecoderStats {
        if !self.assembler.pending().is_empty() || self.session.is_active() {
            info!(
                "Decoder stopped with pending letter {:?} and word {:?}",
                symbols_to_string(self.assembler.pending()),
                self.session.current_word()
            );
        }
        self.stats
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Whether a word is being built
    pub fn is_building_word(&self) -> bool {
        self.session.is_active()
    }

    /// Symbols of the letter in progress as a `.`/`-` string
    pub fn pending_symbols(&self) -> String {
        symbols_to_string(self.assembler.pending())
    }

    /// Letters of the word in progress
    pub fn current_word(&self) -> String {
        self.session.current_word()
    }

    /// Whether the eyes are currently closed
    pub fn eyes_closed(&self) -> bool {
        self.sampler.is_closed()
    }

    fn advance_clock(&mut self, t_ms: Millis) -> Result<(), DecodeError> {
        let backwards = self.last_ms.is_some_and(|last| t_ms < last);
        if !t_ms.is_finite() || backwards {
            warn!("Rejected timestamp {} ms (last {:?} ms)", t_ms, self.last_ms);
            return Err(DecodeError::InvalidTimestamp {
                last: self.last_ms,
                got: t_ms,
            });
        }
        self.last_ms = Some(t_ms);
        Ok(())
    }

    /// A closure that may still end as a dot or dash holds the letter gap at
    /// its start; once it is long enough to be a word toggle, no symbol can
    /// join the letter and elapsed time counts again
    fn idle_check(&mut self, now_ms: Millis, events: &mut Vec<DecoderEvent>) {
        let gap_end_ms = match self.sampler.closed_since() {
            Some(since) if now_ms - since < self.classifier.word_toggle_min_ms() => since,
            _ => now_ms,
        };
        if let Some(letter) = self.assembler.on_idle_check(gap_end_ms, &mut self.session) {
            self.record_letter(letter, now_ms, events);
        }
    }

    fn record_letter(&mut self, outcome: LetterOutcome, at_ms: Millis, events: &mut Vec<DecoderEvent>) {
        match outcome {
            LetterOutcome::Decoded { letter, code, known } => {
                self.stats.letters += 1;
                if !known {
                    self.stats.unknown_letters += 1;
                }
                info!("Decoded letter: {} -> {}", code, letter);
                events.push(DecoderEvent::LetterDecoded {
                    letter,
                    code,
                    at_ms,
                });
            }
            LetterOutcome::Discarded { .. } => {
                self.stats.discarded_letters += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToggleFlush;
    use pretty_assertions::assert_eq;

    const FRAME_MS: Millis = 50.0;

    fn config() -> DecoderConfig {
        DecoderConfig::new(350.0, 4000.0, 700.0)
    }

    /// Sample closed intervals `(start, duration)` at a fixed frame period
    fn frames(closed: &[(Millis, Millis)], until_ms: Millis) -> Vec<Observation> {
        let mut observations = Vec::new();
        let mut t = 0.0;
        while t <= until_ms {
            let eyes_closed = closed
                .iter()
                .any(|&(start, duration)| t >= start && t < start + duration);
            observations.push(Observation::new(t, eyes_closed));
            t += FRAME_MS;
        }
        observations
    }

    fn letters(events: &[DecoderEvent]) -> Vec<char> {
        events
            .iter()
            .filter_map(|e| match e {
                DecoderEvent::LetterDecoded { letter, .. } => Some(*letter),
                _ => None,
            })
            .collect()
    }

    fn words(events: &[DecoderEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                DecoderEvent::WordCompleted { word, .. } => Some(word.clone()),
                _ => None,
            })
            .collect()
    }

    /// Observations at state changes only: `(closed, open)` durations
    fn transitions(blinks: &[(Millis, Millis)]) -> Vec<Observation> {
        let mut observations = Vec::new();
        let mut t = 0.0;
        for &(closed, open) in blinks {
            observations.push(Observation::new(t, true));
            t += closed;
            observations.push(Observation::new(t, false));
            t += open;
        }
        observations
    }

    #[test]
    fn test_scenario_sos_letter() {
        // toggle, three dots 700ms apart, toggle
        let blinks = [
            (4200.0, 300.0),
            (200.0, 700.0),
            (200.0, 700.0),
            (200.0, 700.0),
            (4200.0, 0.0),
        ];
        let events = decode_observations(config(), &transitions(&blinks)).unwrap();

        assert_eq!(
            events,
            vec![
                DecoderEvent::LetterDecoded {
                    letter: 'S',
                    code: "...".to_string(),
                    // Closed by the check on the toggle's reopening sample
                    at_ms: 11_400.0,
                },
                DecoderEvent::WordCompleted {
                    word: "S".to_string(),
                    at_ms: 11_400.0,
                },
            ]
        );
    }

    #[test]
    fn test_scenario_sos_letter_sampled_per_frame() {
        let schedule = [
            (0.0, 4200.0),
            (4500.0, 200.0),
            (5400.0, 200.0),
            (6300.0, 200.0),
            (7200.0, 4200.0),
        ];
        let events = decode_observations(config(), &frames(&schedule, 11_600.0)).unwrap();

        assert_eq!(letters(&events), vec!['S']);
        assert_eq!(words(&events), vec!["S".to_string()]);
        // The closure starting at 7200 is a toggle from 11200 on
        assert_eq!(events[0].at_ms(), 11_200.0);
    }

    #[test]
    fn test_scenario_dash_dot_is_n() {
        let schedule = [
            (0.0, 4200.0),
            (4500.0, 600.0),
            (5400.0, 200.0),
            (6500.0, 4200.0),
        ];
        let events = decode_observations(config(), &frames(&schedule, 11_000.0)).unwrap();

        assert_eq!(letters(&events), vec!['N']);
        assert_eq!(words(&events), vec!["N".to_string()]);
    }

    #[test]
    fn test_scenario_unknown_sequence_continues() {
        let mut decoder = BlinkDecoder::new(config()).unwrap();
        let mut t = 0.0;
        let mut events = Vec::new();

        let blink = |decoder: &mut BlinkDecoder, t: &mut Millis, duration: Millis| {
            let mut out = decoder.observe(*t, true).unwrap();
            *t += duration;
            out.extend(decoder.observe(*t, false).unwrap());
            *t += 100.0;
            out
        };

        events.extend(blink(&mut decoder, &mut t, 4200.0));
        for mark in "----.----".chars() {
            let duration = if mark == '.' { 200.0 } else { 600.0 };
            events.extend(blink(&mut decoder, &mut t, duration));
        }
        t += 1000.0;
        events.extend(decoder.tick(t).unwrap());

        // Still decoding after the unknown letter
        for _ in 0..2 {
            events.extend(blink(&mut decoder, &mut t, 200.0));
        }
        t += 1000.0;
        events.extend(decoder.tick(t).unwrap());
        events.extend(blink(&mut decoder, &mut t, 4200.0));

        assert_eq!(letters(&events), vec!['?', 'I']);
        assert_eq!(words(&events), vec!["?I".to_string()]);
        assert_eq!(decoder.stats().unknown_letters, 1);
        assert_eq!(decoder.stats().letters, 2);
    }

    #[test]
    fn test_toggle_twice_yields_empty_word() {
        let schedule = [(0.0, 4200.0), (4500.0, 4200.0)];
        let events = decode_observations(config(), &frames(&schedule, 9000.0)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(words(&events), vec![String::new()]);
    }

    #[test]
    fn test_non_monotonic_timestamp_leaves_state() {
        let mut decoder = BlinkDecoder::new(config()).unwrap();
        decoder.observe(0.0, true).unwrap();
        decoder.observe(4200.0, false).unwrap();
        decoder.observe(4300.0, true).unwrap();
        decoder.observe(4500.0, false).unwrap();

        let stats_before = decoder.stats().clone();
        assert_eq!(decoder.pending_symbols(), ".");
        assert!(decoder.is_building_word());

        let result = decoder.observe(4400.0, true);
        assert!(matches!(
            result,
            Err(DecodeError::InvalidTimestamp {
                last: Some(last),
                got,
            }) if last == 4500.0 && got == 4400.0
        ));
        assert!(decoder.tick(f64::NAN).is_err());

        assert_eq!(decoder.pending_symbols(), ".");
        assert!(decoder.is_building_word());
        assert!(!decoder.eyes_closed());
        assert_eq!(decoder.stats(), &stats_before);

        // Caller drops the bad sample and carries on
        let events = decoder.tick(5300.0).unwrap();
        assert_eq!(letters(&events), vec!['E']);
    }

    #[test]
    fn test_equal_timestamps_accepted() {
        let mut decoder = BlinkDecoder::new(config()).unwrap();
        decoder.observe(100.0, false).unwrap();
        assert!(decoder.tick(100.0).is_ok());
        assert!(decoder.observe(100.0, true).is_ok());
    }

    #[test]
    fn test_letters_outside_word_are_discarded() {
        let schedule = [(0.0, 200.0), (1500.0, 4200.0), (6000.0, 4200.0)];
        let events = decode_observations(config(), &frames(&schedule, 11_000.0)).unwrap();

        assert!(letters(&events).is_empty());
        assert_eq!(words(&events), vec![String::new()]);
    }

    #[test]
    fn test_discard_counted_in_stats() {
        let mut decoder = BlinkDecoder::new(config()).unwrap();
        decoder.observe(0.0, true).unwrap();
        decoder.observe(200.0, false).unwrap();
        decoder.tick(1000.0).unwrap();
        assert_eq!(decoder.pending_symbols(), "");
        assert_eq!(decoder.stats().discarded_letters, 1);
        assert_eq!(decoder.stats().dots, 1);
    }

    #[test]
    fn test_toggle_policy_discard_vs_flush() {
        // toggle, dot, dot, then toggle; the letter gap outlasts the toggle
        // so the letter is still pending when the toggle lands
        let config = DecoderConfig::new(350.0, 4000.0, 5000.0);
        let observations = vec![
            Observation::new(0.0, true),
            Observation::new(4200.0, false),
            Observation::new(4300.0, true),
            Observation::new(4500.0, false),
            Observation::new(4600.0, true),
            Observation::new(4800.0, false),
            Observation::new(4850.0, true),
            Observation::new(4850.0 + 4200.0, false),
        ];

        let events = decode_observations(config.clone(), &observations).unwrap();
        assert!(letters(&events).is_empty());
        assert_eq!(words(&events), vec![String::new()]);
        assert_eq!(events[0].at_ms(), 9050.0);

        let flush = config.with_toggle_flush(ToggleFlush::Flush);
        let events = decode_observations(flush, &observations).unwrap();
        assert_eq!(letters(&events), vec!['I']);
        assert_eq!(words(&events), vec!["I".to_string()]);
    }

    #[test]
    fn test_closure_that_may_be_a_symbol_holds_letter_gap() {
        let mut decoder = BlinkDecoder::new(config()).unwrap();
        decoder.observe(0.0, true).unwrap();
        decoder.observe(4200.0, false).unwrap();
        decoder.observe(4300.0, true).unwrap();
        decoder.observe(4500.0, false).unwrap();
        decoder.observe(4600.0, true).unwrap();

        // Eyes closed since 4600: the gap stays at 100ms
        assert!(decoder.tick(5200.0).unwrap().is_empty());
        assert_eq!(decoder.pending_symbols(), ".");

        // The closure turns out to be a dash; both symbols form one letter
        decoder.observe(5400.0, false).unwrap();
        assert_eq!(decoder.pending_symbols(), ".-");
        assert!(decoder.tick(6100.0).unwrap().is_empty());
        let events = decoder.tick(6101.0).unwrap();
        assert_eq!(letters(&events), vec!['A']);
    }

    #[test]
    fn test_toggle_length_closure_closes_letter() {
        let mut decoder = BlinkDecoder::new(config()).unwrap();
        decoder.observe(0.0, true).unwrap();
        decoder.observe(4200.0, false).unwrap();
        decoder.observe(4300.0, true).unwrap();
        decoder.observe(4500.0, false).unwrap();
        decoder.observe(4600.0, true).unwrap();

        assert!(decoder.tick(8599.0).unwrap().is_empty());
        let events = decoder.tick(8600.0).unwrap();
        assert_eq!(letters(&events), vec!['E']);
        assert_eq!(events[0].at_ms(), 8600.0);

        let events = decoder.observe(8700.0, false).unwrap();
        assert_eq!(words(&events), vec!["E".to_string()]);
        assert_eq!(decoder.stats().discarded_letters, 0);
    }

    #[test]
    fn test_gap_before_closure_closes_letter_on_close() {
        let mut decoder = BlinkDecoder::new(config()).unwrap();
        decoder.observe(0.0, true).unwrap();
        decoder.observe(4200.0, false).unwrap();
        decoder.observe(4300.0, true).unwrap();
        decoder.observe(4500.0, false).unwrap();

        // No ticks during the gap: the closing sample closes the letter
        let events = decoder.observe(5300.0, true).unwrap();
        assert_eq!(letters(&events), vec!['E']);
        decoder.observe(5500.0, false).unwrap();
        assert_eq!(decoder.pending_symbols(), ".");
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let result = BlinkDecoder::new(DecoderConfig::new(500.0, 400.0, 700.0));
        assert!(matches!(result, Err(DecodeError::InvalidConfig(_))));
    }

    #[test]
    fn test_multiple_words_and_stats() {
        let schedule = [
            (0.0, 4200.0),
            (4500.0, 200.0), // E
            (5500.0, 4200.0),
            (10_000.0, 4200.0),
            (14_500.0, 600.0), // T
            (16_000.0, 4200.0),
        ];
        let observations = frames(&schedule, 21_000.0);

        let mut decoder = BlinkDecoder::new(config()).unwrap();
        let mut events = Vec::new();
        for obs in &observations {
            events.extend(decoder.observe(obs.t_ms, obs.eyes_closed).unwrap());
        }

        assert_eq!(words(&events), vec!["E".to_string(), "T".to_string()]);
        assert!(!decoder.is_building_word());

        let stats = decoder.finish();
        assert_eq!(
            stats,
            DecoderStats {
                blinks: 6,
                dots: 1,
                dashes: 1,
                toggles: 4,
                letters: 2,
                unknown_letters: 0,
                discarded_letters: 0,
                words: 2,
            }
        );
    }

    #[test]
    fn test_decode_stream_ndjson() {
        let ndjson = r#"
{"kind":"observation","t_ms":0,"eyes_closed":true}
{"kind":"observation","t_ms":4200,"eyes_closed":false}
{"kind":"observation","t_ms":4300,"eyes_closed":true}
{"kind":"observation","t_ms":4900,"eyes_closed":false}
{"kind":"tick","t_ms":5600}
{"kind":"tick","t_ms":5650}
{"kind":"observation","t_ms":5700,"eyes_closed":true}
{"kind":"observation","t_ms":9900,"eyes_closed":false}
"#;
        let events = decode_stream_ndjson(config(), ndjson).unwrap();
        assert_eq!(letters(&events), vec!['T']);
        // 700ms after the dash is not yet past the letter gap
        assert_eq!(events[0].at_ms(), 5650.0);
        assert_eq!(words(&events), vec!["T".to_string()]);
    }

    #[test]
    fn test_apply_rejects_invalid_record() {
        let mut decoder = BlinkDecoder::new(config()).unwrap();
        let result = decoder.apply(&StreamRecord::tick(f64::NAN));
        assert!(matches!(result, Err(DecodeError::ParseError(_))));

        // Negative time bases are fine as long as they do not go backwards
        assert!(decoder.apply(&StreamRecord::observation(-500.0, false)).is_ok());
        assert!(decoder.apply(&StreamRecord::tick(-400.0)).is_ok());
    }
}
