//! Generic (fallback) program layout.
//!
//! Always matches. Talks are elements carrying the `talk` class; fields are
//! found by class name first and by plain HTML structure second.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ProgramLayout, TalkEntry, split_speakers, text_of};

static TALK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".talk").expect("talk selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".title").expect("title selector"));
static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("heading selector"));
static SPEAKER_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".speaker").expect("speaker selector"));
static DESCRIPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".description").expect("description selector"));
static PARAGRAPH_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("paragraph selector"));
static BEGIN_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time.begin, .begin").expect("begin selector"));
static END_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("time.end, .end").expect("end selector"));
static RANGE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".time").expect("time selector"));

/// Layout that works on any page marking talks with a `talk` class.
/// Always matches as the lowest-priority fallback.
pub struct GenericLayout;

impl ProgramLayout for GenericLayout {
    fn detect(&self, _doc: &Html) -> bool {
        // Generic layout always matches
        true
    }

    fn extract_entries(&self, doc: &Html) -> Vec<TalkEntry> {
        doc.select(&TALK_SEL).map(read_talk).collect()
    }

    fn name(&self) -> &str {
        "generic"
    }
}

fn read_talk(talk: ElementRef<'_>) -> TalkEntry {
    let title = first_text(talk, &TITLE_SEL).or_else(|| first_text(talk, &HEADING_SEL));

    let speakers = talk
        .select(&SPEAKER_SEL)
        .flat_map(|el| split_speakers(&text_of(el)))
        .collect();

    let description = first_text(talk, &DESCRIPTION_SEL)
        .or_else(|| first_text(talk, &PARAGRAPH_SEL))
        .unwrap_or_default();

    TalkEntry {
        title,
        speakers,
        description,
        begin: talk.select(&BEGIN_SEL).next().map(time_value),
        end: talk.select(&END_SEL).next().map(time_value),
        time_range: first_text(talk, &RANGE_SEL),
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(text_of)
        .filter(|text| !text.is_empty())
}

/// `datetime` attribute of a `<time>` element, else its text.
fn time_value(el: ElementRef<'_>) -> String {
    el.value()
        .attr("datetime")
        .map(str::to_string)
        .unwrap_or_else(|| text_of(el))
}
