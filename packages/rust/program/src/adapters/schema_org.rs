//! schema.org `Event` microdata layout.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{ProgramLayout, TalkEntry, text_of};

static EVENT_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[itemscope][itemtype*="schema.org/"][itemtype$="Event"]"#)
        .expect("event selector")
});
static NAME_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop~="name"]"#).expect("name selector"));
static PERFORMER_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[itemprop~="performer"]"#).expect("performer selector")
});
static DESCRIPTION_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[itemprop~="description"]"#).expect("description selector")
});
static START_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop~="startDate"]"#).expect("start selector"));
static END_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[itemprop~="endDate"]"#).expect("end selector"));

/// Reads programs that annotate each talk as a schema.org `Event`.
pub struct SchemaOrgLayout;

impl ProgramLayout for SchemaOrgLayout {
    fn detect(&self, doc: &Html) -> bool {
        doc.select(&EVENT_SEL).next().is_some()
    }

    fn extract_entries(&self, doc: &Html) -> Vec<TalkEntry> {
        doc.select(&EVENT_SEL).map(read_event).collect()
    }

    fn name(&self) -> &str {
        "schema-org"
    }
}

fn read_event(event: ElementRef<'_>) -> TalkEntry {
    let title = own_props(event, &NAME_SEL).next().map(text_of);

    let speakers = own_props(event, &PERFORMER_SEL)
        .map(|performer| match performer.select(&NAME_SEL).next() {
            Some(name) => text_of(name),
            None => text_of(performer),
        })
        .filter(|name| !name.is_empty())
        .collect();

    let description = own_props(event, &DESCRIPTION_SEL)
        .next()
        .map(text_of)
        .unwrap_or_default();

    TalkEntry {
        title,
        speakers,
        description,
        begin: own_props(event, &START_SEL).next().map(prop_value),
        end: own_props(event, &END_SEL).next().map(prop_value),
        time_range: None,
    }
}

/// Properties that belong to `event` itself, not to a nested item such as a
/// performer's `Person`.
fn own_props<'a>(
    event: ElementRef<'a>,
    selector: &'a Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    event
        .select(selector)
        .filter(move |el| nearest_scope(*el).is_some_and(|scope| scope.id() == event.id()))
}

/// Closest ancestor that opens an item scope.
fn nearest_scope(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().attr("itemscope").is_some())
}

/// Machine-readable value of a microdata property.
fn prop_value(el: ElementRef<'_>) -> String {
    el.value()
        .attr("content")
        .or_else(|| el.value().attr("datetime"))
        .map(str::to_string)
        .unwrap_or_else(|| text_of(el))
}
