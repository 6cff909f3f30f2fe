#![no_main]

use libfuzzer_sys::fuzz_target;
use locsync::pseudo::{ProtectedSpans, PseudoLocalizer, Segment};
use locsync::Entry;

fuzz_target!(|inputs: (&str, &str, &str, u8)| {
    let (text, prefix, suffix, expansion) = inputs;
    let spans = ProtectedSpans::new(r"\{[^}\[<]+\}", r"<[^/>]+/>").expect("Valid patterns");

    let segments = spans.segments(text);
    let joined = segments
        .iter()
        .map(|segment| match segment {
            Segment::Protected(span) | Segment::Translatable(span) => *span,
        })
        .collect::<String>();
    assert_eq!(joined, text);

    let localizer =
        PseudoLocalizer::new(spans.clone(), prefix, suffix).with_filler("~", u32::from(expansion));
    let rendered = localizer.render(&Entry::new(text).with_occurrence("/Game/Fuzz"));
    assert!(rendered.starts_with(prefix));
    assert!(rendered.ends_with(suffix));
    for span in spans.protected(text) {
        assert!(rendered.contains(span));
    }
});
