//! Day-notes domain library.
//! Parses the line-based daily journal format into a located element tree
//! (document, days, intros, entries), collects parse issues instead of failing,
//! and exposes read-only projectors for dump, outline, highlighting and stats views.

pub mod core {
    use serde::{Deserialize, Serialize};
    use std::fmt;

    /* ------------------------------ Locations ------------------------------ */

    /// Source range of an item. Lines and characters are 1-based; the start is
    /// inclusive and the end exclusive. Character values of 0 mean the range
    /// covers whole lines. Unknown positions are modelled as `Option<Location>`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct Location {
        start_line: usize,
        start_char: usize,
        end_line: usize,
        end_char: usize,
    }

    impl Location {
        /// Checked constructor for arbitrary ranges.
        pub fn new(
            start_line: usize,
            start_char: usize,
            end_line: usize,
            end_char: usize,
        ) -> Result<Self, DomainError> {
            if start_line == 0 {
                return Err(DomainError::ZeroLine);
            }
            if end_line < start_line {
                return Err(DomainError::InvertedLines {
                    start_line,
                    end_line,
                });
            }
            if end_line == start_line && end_char < start_char {
                return Err(DomainError::InvertedChars {
                    line: start_line,
                    start_char,
                    end_char,
                });
            }
            Ok(Self {
                start_line,
                start_char,
                end_line,
                end_char,
            })
        }

        /// Whole lines `start_line..end_line`.
        pub fn line_span(start_line: usize, end_line: usize) -> Result<Self, DomainError> {
            Self::new(start_line, 0, end_line, 0)
        }

        /// `len` characters on `line`, starting at the 1-based `start_char`.
        pub fn char_span(line: usize, start_char: usize, len: usize) -> Result<Self, DomainError> {
            if start_char == 0 {
                return Err(DomainError::ZeroChar { line });
            }
            Self::new(line, start_char, line, start_char + len)
        }

        /// Unchecked [`Location::line_span`]; callers guarantee `1 <= start_line <= end_line`.
        pub(crate) fn lines(start_line: usize, end_line: usize) -> Self {
            debug_assert!(start_line >= 1 && end_line >= start_line);
            Self {
                start_line,
                start_char: 0,
                end_line,
                end_char: 0,
            }
        }

        /// Unchecked [`Location::char_span`]; callers guarantee `line >= 1` and `start_char >= 1`.
        pub(crate) fn chars(line: usize, start_char: usize, len: usize) -> Self {
            debug_assert!(line >= 1 && start_char >= 1);
            Self {
                start_line: line,
                start_char,
                end_line: line,
                end_char: start_char + len,
            }
        }

        pub fn start_line(&self) -> usize {
            self.start_line
        }

        pub fn start_char(&self) -> usize {
            self.start_char
        }

        pub fn end_line(&self) -> usize {
            self.end_line
        }

        pub fn end_char(&self) -> usize {
            self.end_char
        }

        /// True when both character fields are set (a character-wise range).
        pub fn has_chars(&self) -> bool {
            self.start_char > 0 && self.end_char > 0
        }

        /// Number of lines touched. A character range on a single line counts as one.
        pub fn line_count(&self) -> usize {
            let lines = self.end_line - self.start_line;
            if self.has_chars() { lines + 1 } else { lines }
        }

        /// Last line the range touches (inclusive).
        pub fn last_line(&self) -> usize {
            if self.has_chars() {
                self.end_line
            } else {
                self.end_line.saturating_sub(1).max(self.start_line)
            }
        }
    }

    impl fmt::Display for Location {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            if self.has_chars() {
                write!(
                    f,
                    "({},{})-({},{})",
                    self.start_line, self.start_char, self.end_line, self.end_char
                )
            } else {
                write!(f, "{}-{}", self.start_line, self.end_line)
            }
        }
    }

    /* ------------------------------ Parse issues ------------------------------ */

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub enum Severity {
        /// Input was understood under assumptions that may not hold.
        Warning,
        /// A field could not be parsed and was left unset.
        Error,
    }

    impl fmt::Display for Severity {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Severity::Warning => f.write_str("Warning"),
                Severity::Error => f.write_str("Error"),
            }
        }
    }

    /// A located, non-fatal diagnostic. Issues are data; they are never raised.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct ParseIssue {
        severity: Severity,
        location: Option<Location>,
        message: String,
    }

    impl ParseIssue {
        pub fn new(
            severity: Severity,
            location: Option<Location>,
            message: impl Into<String>,
        ) -> Self {
            Self {
                severity,
                location,
                message: message.into(),
            }
        }

        pub fn error(location: Location, message: impl Into<String>) -> Self {
            Self::new(Severity::Error, Some(location), message)
        }

        pub fn warning(location: Location, message: impl Into<String>) -> Self {
            Self::new(Severity::Warning, Some(location), message)
        }

        pub fn severity(&self) -> Severity {
            self.severity
        }

        pub fn location(&self) -> Option<Location> {
            self.location
        }

        pub fn message(&self) -> &str {
            &self.message
        }
    }

    impl fmt::Display for ParseIssue {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}: {}", self.severity, self.message)
        }
    }

    /* ----------------------------- Located values ----------------------------- */

    /// A parsed value and the source range it came from.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct LocatableItem<T> {
        location: Option<Location>,
        value: T,
    }

    impl<T> LocatableItem<T> {
        /// Wraps a value whose position is not known (e.g. a defaulted field).
        pub fn new(value: T) -> Self {
            Self {
                location: None,
                value,
            }
        }

        pub fn at(location: Location, value: T) -> Self {
            Self {
                location: Some(location),
                value,
            }
        }

        pub fn location(&self) -> Option<Location> {
            self.location
        }

        pub fn value(&self) -> &T {
            &self.value
        }

        pub fn into_value(self) -> T {
            self.value
        }
    }

    /// Coarse syntax-highlighting class; presentation only.
    #[derive(
        Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
    )]
    pub enum SemanticClass {
        #[default]
        None,
        Type,
        Identifier,
        Constant,
        Keyword,
    }

    impl fmt::Display for SemanticClass {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                SemanticClass::None => "none",
                SemanticClass::Type => "type",
                SemanticClass::Identifier => "identifier",
                SemanticClass::Constant => "constant",
                SemanticClass::Keyword => "keyword",
            };
            f.write_str(name)
        }
    }

    /// A [`LocatableItem`] tagged with a [`SemanticClass`].
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct SemanticLocatableItem<T> {
        #[serde(flatten)]
        item: LocatableItem<T>,
        class: SemanticClass,
    }

    impl<T> SemanticLocatableItem<T> {
        pub fn new(item: LocatableItem<T>, class: SemanticClass) -> Self {
            Self { item, class }
        }

        pub fn at(location: Location, value: T, class: SemanticClass) -> Self {
            Self::new(LocatableItem::at(location, value), class)
        }

        pub fn unlocated(value: T, class: SemanticClass) -> Self {
            Self::new(LocatableItem::new(value), class)
        }

        pub fn item(&self) -> &LocatableItem<T> {
            &self.item
        }

        pub fn location(&self) -> Option<Location> {
            self.item.location()
        }

        pub fn value(&self) -> &T {
            self.item.value()
        }

        pub fn class(&self) -> SemanticClass {
            self.class
        }

        /// The highlightable span, if the position is known.
        pub fn span(&self) -> Option<SemanticSpan> {
            self.location().map(|location| SemanticSpan {
                location,
                class: self.class,
            })
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct SemanticSpan {
        pub location: Location,
        pub class: SemanticClass,
    }

    /* ---------------------------- Errors (domain) ---------------------------- */

    /// Contract violations by a caller; malformed content is reported as [`ParseIssue`]s instead.
    #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
    pub enum DomainError {
        #[error("line numbers start at 1; leave the location unset when it is unknown")]
        ZeroLine,
        #[error("end line {end_line} lies before start line {start_line}")]
        InvertedLines { start_line: usize, end_line: usize },
        #[error("end character {end_char} lies before start character {start_char} on line {line}")]
        InvertedChars {
            line: usize,
            start_char: usize,
            end_char: usize,
        },
        #[error("character positions start at 1 (line {line}); use a line-wise range instead")]
        ZeroChar { line: usize },
        #[error("blank line {line} inside a day block")]
        BlankLineInDayBlock { line: usize },
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn checked_constructor_rejects_inverted_ranges() {
            assert_eq!(Location::new(0, 0, 0, 0), Err(DomainError::ZeroLine));
            assert!(matches!(
                Location::new(5, 1, 4, 1),
                Err(DomainError::InvertedLines { .. })
            ));
            assert!(matches!(
                Location::new(5, 7, 5, 3),
                Err(DomainError::InvertedChars { line: 5, .. })
            ));
            assert!(Location::new(5, 7, 6, 3).is_ok());
        }

        #[test]
        fn public_span_helpers_are_checked() {
            assert!(matches!(
                Location::line_span(5, 3),
                Err(DomainError::InvertedLines {
                    start_line: 5,
                    end_line: 3
                })
            ));
            assert_eq!(Location::line_span(0, 2), Err(DomainError::ZeroLine));
            assert_eq!(Location::char_span(0, 1, 4), Err(DomainError::ZeroLine));
            assert_eq!(
                Location::char_span(3, 0, 4),
                Err(DomainError::ZeroChar { line: 3 })
            );
            assert_eq!(Location::line_span(2, 4), Ok(Location::lines(2, 4)));
            assert_eq!(Location::char_span(2, 5, 3), Ok(Location::chars(2, 5, 3)));
        }

        #[test]
        fn line_count_depends_on_character_fields() {
            assert_eq!(Location::lines(3, 5).line_count(), 2);
            assert_eq!(Location::chars(3, 1, 5).line_count(), 1);
            assert_eq!(Location::lines(3, 3).line_count(), 0);
            let multi = Location::new(2, 4, 4, 2).expect("valid");
            assert_eq!(multi.line_count(), 3);
            assert_eq!(multi.last_line(), 4);
            assert_eq!(Location::lines(2, 4).last_line(), 3);
        }

        #[test]
        fn display_forms() {
            assert_eq!(Location::chars(7, 12, 3).to_string(), "(7,12)-(7,15)");
            assert_eq!(Location::lines(7, 9).to_string(), "7-9");
            let issue = ParseIssue::warning(Location::lines(1, 2), "odd");
            assert_eq!(issue.to_string(), "Warning: odd");
        }

        #[test]
        fn semantic_item_without_location_has_no_span() {
            let chapter = SemanticLocatableItem::unlocated(1u32, SemanticClass::Constant);
            assert_eq!(*chapter.value(), 1);
            assert!(chapter.span().is_none());

            let located =
                SemanticLocatableItem::at(Location::chars(1, 1, 4), "foo", SemanticClass::Type);
            let span = located.span().expect("span");
            assert_eq!(span.class, SemanticClass::Type);
            assert_eq!(span.location.end_char(), 5);
        }
    }
}

pub mod tree {
    //! Element tree: `Document → Day → {Intro, Entry}`.
    //!
    //! Elements are frozen once built by the parser; totals are computed at
    //! construction from the children's already-final totals.

    use super::core::*;
    use chrono::NaiveDate;
    use serde::Serialize;
    use std::fmt;

    /// Literal that stands in for a day's date when the day was skipped.
    pub const SKIP_MARKER: &str = "[...]";

    /// Capabilities shared by every node of the tree.
    pub trait NotesElement {
        fn kind(&self) -> ElementKind;

        /// 1-based line the element starts on.
        fn start_line_number(&self) -> usize;

        fn total_line_count(&self) -> usize;

        /// Human-readable one-line description. Never fails; unset fields get placeholders.
        fn passive_summary(&self) -> String;

        fn children(&self) -> Vec<ElementRef<'_>>;

        /// Issues recorded on this element itself.
        fn parse_issues(&self) -> &[ParseIssue];

        /// Own issues plus those of all descendants.
        fn total_issue_count(&self) -> usize;

        /// Highlightable spans; only leaves emit any.
        fn semantic_spans(&self) -> Vec<SemanticSpan> {
            Vec::new()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub enum ElementKind {
        Document,
        Day,
        Intro,
        Entry,
    }

    impl fmt::Display for ElementKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let name = match self {
                ElementKind::Document => "document",
                ElementKind::Day => "day",
                ElementKind::Intro => "intro",
                ElementKind::Entry => "entry",
            };
            f.write_str(name)
        }
    }

    /// Borrowed handle to any tree node, for exhaustive matching and traversal.
    #[derive(Debug, Clone, Copy)]
    pub enum ElementRef<'a> {
        Document(&'a Document),
        Day(&'a Day),
        Intro(&'a Intro),
        Entry(&'a Entry),
    }

    impl<'a> ElementRef<'a> {
        fn as_element(self) -> &'a dyn NotesElement {
            match self {
                ElementRef::Document(d) => d,
                ElementRef::Day(d) => d,
                ElementRef::Intro(i) => i,
                ElementRef::Entry(e) => e,
            }
        }

        /// Children borrowed for the full lifetime of the tree.
        pub fn child_refs(self) -> Vec<ElementRef<'a>> {
            match self {
                ElementRef::Document(doc) => doc.days.iter().map(ElementRef::Day).collect(),
                ElementRef::Day(day) => day
                    .intro
                    .iter()
                    .map(ElementRef::Intro)
                    .chain(day.entries.iter().map(ElementRef::Entry))
                    .collect(),
                ElementRef::Intro(_) | ElementRef::Entry(_) => Vec::new(),
            }
        }

        /// Depth-first, pre-order walk including `self` at depth 0.
        pub fn preorder(self) -> Vec<(usize, ElementRef<'a>)> {
            fn rec<'a>(el: ElementRef<'a>, depth: usize, out: &mut Vec<(usize, ElementRef<'a>)>) {
                out.push((depth, el));
                for child in el.child_refs() {
                    rec(child, depth + 1, out);
                }
            }
            let mut out = Vec::new();
            rec(self, 0, &mut out);
            out
        }
    }

    impl NotesElement for ElementRef<'_> {
        fn kind(&self) -> ElementKind {
            self.as_element().kind()
        }

        fn start_line_number(&self) -> usize {
            self.as_element().start_line_number()
        }

        fn total_line_count(&self) -> usize {
            self.as_element().total_line_count()
        }

        fn passive_summary(&self) -> String {
            self.as_element().passive_summary()
        }

        fn children(&self) -> Vec<ElementRef<'_>> {
            self.child_refs()
        }

        fn parse_issues(&self) -> &[ParseIssue] {
            self.as_element().parse_issues()
        }

        fn total_issue_count(&self) -> usize {
            self.as_element().total_issue_count()
        }

        fn semantic_spans(&self) -> Vec<SemanticSpan> {
            self.as_element().semantic_spans()
        }
    }

    /* ------------------------------- Document ------------------------------- */

    /// Aggregate root: one notes file.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Document {
        pub(crate) days: Vec<Day>,
        pub(crate) total_line_count: usize,
        pub(crate) total_issue_count: usize,
    }

    impl Document {
        /// Assembles a document from already-built days. Without the raw input,
        /// separator lines are unknown, so the line total is the days' sum.
        pub fn new(days: Vec<Day>) -> Self {
            let total_line_count = days.iter().map(|d| d.total_line_count).sum();
            Self::assemble(days, total_line_count)
        }

        pub(crate) fn assemble(days: Vec<Day>, physical_lines: usize) -> Self {
            let total_issue_count = days.iter().map(|d| d.total_issue_count).sum();
            Self {
                days,
                total_line_count: physical_lines,
                total_issue_count,
            }
        }

        pub fn days(&self) -> &[Day] {
            &self.days
        }

        pub fn element(&self) -> ElementRef<'_> {
            ElementRef::Document(self)
        }
    }

    impl NotesElement for Document {
        fn kind(&self) -> ElementKind {
            ElementKind::Document
        }

        fn start_line_number(&self) -> usize {
            // Notes always begin at the start of the input.
            1
        }

        fn total_line_count(&self) -> usize {
            self.total_line_count
        }

        fn passive_summary(&self) -> String {
            format!("Notes with {} days", self.days.len())
        }

        fn children(&self) -> Vec<ElementRef<'_>> {
            self.element().child_refs()
        }

        fn parse_issues(&self) -> &[ParseIssue] {
            &[]
        }

        fn total_issue_count(&self) -> usize {
            self.total_issue_count
        }
    }

    /* ---------------------------------- Day ---------------------------------- */

    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Day {
        pub(crate) start_line: usize,
        pub(crate) total_line_count: usize,
        pub(crate) issues: Vec<ParseIssue>,
        pub(crate) total_issue_count: usize,
        pub(crate) intro: Option<Intro>,
        pub(crate) entries: Vec<Entry>,
    }

    impl Day {
        /// Assembles a day from an already-built intro and entries.
        pub fn new(intro: Intro, entries: Vec<Entry>, start_line: usize) -> Result<Self, DomainError> {
            if start_line == 0 {
                return Err(DomainError::ZeroLine);
            }
            let total_line_count = intro.total_line_count
                + entries.iter().map(|e| e.total_line_count).sum::<usize>();
            let total_issue_count = intro.issues.len()
                + entries.iter().map(|e| e.issues.len()).sum::<usize>();
            Ok(Self {
                start_line,
                total_line_count,
                issues: Vec::new(),
                total_issue_count,
                intro: Some(intro),
                entries,
            })
        }

        pub fn intro(&self) -> Option<&Intro> {
            self.intro.as_ref()
        }

        pub fn entries(&self) -> &[Entry] {
            &self.entries
        }

        pub fn element(&self) -> ElementRef<'_> {
            ElementRef::Day(self)
        }
    }

    impl NotesElement for Day {
        fn kind(&self) -> ElementKind {
            ElementKind::Day
        }

        fn start_line_number(&self) -> usize {
            self.start_line
        }

        fn total_line_count(&self) -> usize {
            self.total_line_count
        }

        fn passive_summary(&self) -> String {
            let intro = self
                .intro
                .as_ref()
                .map(Intro::intro_formatted)
                .unwrap_or_else(|| "(Unknown)".to_string());
            format!("{}: {} entries", intro, self.entries.len())
        }

        fn children(&self) -> Vec<ElementRef<'_>> {
            self.element().child_refs()
        }

        fn parse_issues(&self) -> &[ParseIssue] {
            &self.issues
        }

        fn total_issue_count(&self) -> usize {
            self.total_issue_count
        }
    }

    /* --------------------------------- Intro --------------------------------- */

    /// First line of a day: date (or skip marker), optional chapter and comment.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Intro {
        pub(crate) start_line: usize,
        pub(crate) total_line_count: usize,
        pub(crate) issues: Vec<ParseIssue>,
        pub(crate) skip: Option<SemanticLocatableItem<String>>,
        pub(crate) date: Option<SemanticLocatableItem<NaiveDate>>,
        pub(crate) chapter: Option<SemanticLocatableItem<i32>>,
        pub(crate) comment: Option<SemanticLocatableItem<String>>,
    }

    impl Intro {
        pub fn is_skip(&self) -> bool {
            self.skip.is_some()
        }

        pub fn skip(&self) -> Option<&SemanticLocatableItem<String>> {
            self.skip.as_ref()
        }

        pub fn date(&self) -> Option<&SemanticLocatableItem<NaiveDate>> {
            self.date.as_ref()
        }

        /// Chapter number; defaults to 1 (without location) when the intro omits it.
        pub fn chapter(&self) -> Option<&SemanticLocatableItem<i32>> {
            self.chapter.as_ref()
        }

        pub fn comment(&self) -> Option<&SemanticLocatableItem<String>> {
            self.comment.as_ref()
        }

        /// `[...]`, the ISO date, or `(date missing)`.
        pub fn date_formatted(&self) -> String {
            if self.is_skip() {
                return SKIP_MARKER.to_string();
            }
            match &self.date {
                Some(date) => date.value().format("%Y-%m-%d").to_string(),
                None => "(date missing)".to_string(),
            }
        }

        /// Compact form used in day summaries, e.g. `2016-09-15 (2) (travel)`.
        pub fn intro_formatted(&self) -> String {
            let mut out = self.date_formatted();
            if let Some(chapter) = self.chapter.as_ref().map(|c| *c.value()) {
                if chapter != 1 {
                    out.push_str(&format!(" ({chapter})"));
                }
            }
            if let Some(comment) = &self.comment {
                out.push_str(&format!(" ({})", comment.value()));
            }
            out
        }

        pub fn element(&self) -> ElementRef<'_> {
            ElementRef::Intro(self)
        }
    }

    impl NotesElement for Intro {
        fn kind(&self) -> ElementKind {
            ElementKind::Intro
        }

        fn start_line_number(&self) -> usize {
            self.start_line
        }

        fn total_line_count(&self) -> usize {
            self.total_line_count
        }

        fn passive_summary(&self) -> String {
            let labelling = if self.is_skip() {
                "Skip".to_string()
            } else {
                match &self.date {
                    Some(date) => format!("Date {}", date.value().format("%Y-%m-%d")),
                    None => "Date (missing)".to_string(),
                }
            };
            let chapter = self
                .chapter
                .as_ref()
                .map(|c| c.value().to_string())
                .unwrap_or_else(|| "(missing)".to_string());
            let comment = self
                .comment
                .as_ref()
                .map(|c| c.value().as_str())
                .unwrap_or("(none)");
            format!("{labelling}, chapter {chapter}, comment: {comment}")
        }

        fn children(&self) -> Vec<ElementRef<'_>> {
            Vec::new()
        }

        fn parse_issues(&self) -> &[ParseIssue] {
            &self.issues
        }

        fn total_issue_count(&self) -> usize {
            self.issues.len()
        }

        fn semantic_spans(&self) -> Vec<SemanticSpan> {
            if let Some(skip) = &self.skip {
                return skip.span().into_iter().collect();
            }
            [
                self.date.as_ref().and_then(|d| d.span()),
                self.chapter.as_ref().and_then(|c| c.span()),
                self.comment.as_ref().and_then(|c| c.span()),
            ]
            .into_iter()
            .flatten()
            .collect()
        }
    }

    /* --------------------------------- Entry --------------------------------- */

    /// A category header line plus its indented continuation lines.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct Entry {
        pub(crate) start_line: usize,
        pub(crate) total_line_count: usize,
        pub(crate) issues: Vec<ParseIssue>,
        pub(crate) category: Option<SemanticLocatableItem<String>>,
        pub(crate) complement: Option<SemanticLocatableItem<String>>,
        pub(crate) body_lines_count: usize,
    }

    impl Entry {
        pub fn category(&self) -> Option<&SemanticLocatableItem<String>> {
            self.category.as_ref()
        }

        pub fn complement(&self) -> Option<&SemanticLocatableItem<String>> {
            self.complement.as_ref()
        }

        /// Continuation lines are kept only as a count.
        pub fn body_lines_count(&self) -> usize {
            self.body_lines_count
        }

        pub fn element(&self) -> ElementRef<'_> {
            ElementRef::Entry(self)
        }
    }

    impl NotesElement for Entry {
        fn kind(&self) -> ElementKind {
            ElementKind::Entry
        }

        fn start_line_number(&self) -> usize {
            self.start_line
        }

        fn total_line_count(&self) -> usize {
            self.total_line_count
        }

        fn passive_summary(&self) -> String {
            let category = self
                .category
                .as_ref()
                .map(|c| c.value().as_str())
                .unwrap_or("(Unknown)");
            let complement = self
                .complement
                .as_ref()
                .map(|c| format!(" / \"{}\"", c.value()))
                .unwrap_or_default();
            format!(
                "Category {category}{complement}; body lines count {}",
                self.body_lines_count
            )
        }

        fn children(&self) -> Vec<ElementRef<'_>> {
            Vec::new()
        }

        fn parse_issues(&self) -> &[ParseIssue] {
            &self.issues
        }

        fn total_issue_count(&self) -> usize {
            self.issues.len()
        }

        fn semantic_spans(&self) -> Vec<SemanticSpan> {
            [
                self.category.as_ref().and_then(|c| c.span()),
                self.complement.as_ref().and_then(|c| c.span()),
            ]
            .into_iter()
            .flatten()
            .collect()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::parser::{parse_entry, parse_intro};

        #[test]
        fn composing_constructors_sum_child_totals() {
            let intro = parse_intro(&["2016-09-15 (x)"], 1).expect("intro");
            let first = parse_entry(&["foo bar", "\tbody"], 2).expect("entry");
            let second = parse_entry(&["\tbroken"], 4).expect("entry");
            let day = Day::new(intro, vec![first, second], 1).expect("day");
            assert_eq!(day.total_line_count(), 4);
            assert_eq!(day.total_issue_count(), 2);
            assert!(day.parse_issues().is_empty());

            let doc = Document::new(vec![day]);
            assert_eq!(doc.total_line_count(), 4);
            assert_eq!(doc.total_issue_count(), 2);
            assert_eq!(doc.start_line_number(), 1);
        }

        #[test]
        fn day_constructor_rejects_line_zero() {
            let intro = parse_intro(&["2016-09-15"], 1).expect("intro");
            assert_eq!(Day::new(intro, Vec::new(), 0), Err(DomainError::ZeroLine));
        }

        #[test]
        fn summaries_use_placeholders_for_unset_fields() {
            let intro = parse_intro(&["someday (two) (chapter)"], 3).expect("intro");
            assert_eq!(
                intro.passive_summary(),
                "Date (missing), chapter (missing), comment: chapter"
            );
            assert_eq!(intro.intro_formatted(), "(date missing) (chapter)");

            let entry = parse_entry(&[" indented"], 4).expect("entry");
            assert_eq!(
                entry.passive_summary(),
                "Category (Unknown); body lines count 0"
            );
        }

        #[test]
        fn intro_formatted_omits_default_chapter() {
            let plain = parse_intro(&["2016-09-15 (1)"], 1).expect("intro");
            assert_eq!(plain.intro_formatted(), "2016-09-15");
            let chaptered = parse_intro(&["2016-09-15 (3) (on the road)"], 1).expect("intro");
            assert_eq!(chaptered.intro_formatted(), "2016-09-15 (3) (on the road)");
            let negative = parse_intro(&["2016-09-15 (-2)"], 1).expect("intro");
            assert_eq!(negative.intro_formatted(), "2016-09-15 (-2)");
            let skipped = parse_intro(&["[...]"], 1).expect("intro");
            assert_eq!(skipped.intro_formatted(), "[...]");
            assert_eq!(
                skipped.passive_summary(),
                "Skip, chapter 1, comment: (none)"
            );
        }

        #[test]
        fn element_ref_dispatch_matches_concrete_element() {
            let entry = parse_entry(&["foo bar"], 9).expect("entry");
            let handle = entry.element();
            assert_eq!(handle.kind(), ElementKind::Entry);
            assert_eq!(handle.start_line_number(), 9);
            assert_eq!(handle.passive_summary(), entry.passive_summary());
            assert_eq!(handle.semantic_spans(), entry.semantic_spans());
            assert!(handle.children().is_empty());
        }
    }
}

pub mod parser {
    //! Line-oriented day-notes parser.
    //!
    //! Parsing strategy:
    //! - Days are split on zero-length lines; separators belong to no element.
    //! - Inside a day, every non-indented line opens a new sub-block; the first
    //!   sub-block is the intro, later ones are entries.
    //! - Intro and entry header fields are parsed with `nom`; failures become
    //!   located [`ParseIssue`]s on the element and parsing continues.

    use crate::core::*;
    use crate::tree::*;
    use anyhow::{Context, Result};
    use chrono::NaiveDate;
    use log::{debug, trace};
    use nom::{
        IResult,
        bytes::complete::{take_till, take_while_m_n},
        character::complete::{char, digit1, one_of},
        combinator::{all_consuming, map_res, opt, recognize, rest},
        error::VerboseError,
        sequence::{pair, preceded, tuple},
    };
    use std::{
        fs::File,
        io::{self, BufRead, BufReader},
        path::Path,
    };

    /* ------------------------ Public entry points ------------------------ */

    /// Failure to obtain input lines. Malformed content never ends up here.
    #[derive(Debug, thiserror::Error)]
    pub enum ReadError {
        #[error("failed to read line {line}")]
        Io {
            line: usize,
            #[source]
            source: io::Error,
        },
    }

    /// Parse notes from an in-memory string. `\n` and `\r\n` endings are accepted.
    pub fn parse_str(input: &str) -> Document {
        parse_lines(input.lines())
    }

    /// Parse notes from any sequence of lines (without terminators).
    pub fn parse_lines<I, S>(lines: I) -> Document
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = DocumentBuilder::default();
        for line in lines {
            builder.push_line(line.as_ref());
        }
        builder.finish()
    }

    /// Parse notes from a sequential reader; only I/O failures are errors.
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<Document, ReadError> {
        let mut builder = DocumentBuilder::default();
        for line in reader.lines() {
            let line = line.map_err(|source| ReadError::Io {
                line: builder.line_number + 1,
                source,
            })?;
            builder.push_line(&line);
        }
        Ok(builder.finish())
    }

    /// Source of parsed notes documents.
    pub trait NotesParser {
        fn parse_file(&self, path: &Path) -> Result<Document>;
    }

    /// Reads notes files from disk line by line.
    pub struct FileNotesParser;

    impl NotesParser for FileNotesParser {
        fn parse_file(&self, path: &Path) -> Result<Document> {
            debug!("parsing notes file {:?}", path);
            let file = File::open(path).with_context(|| format!("opening {:?}", path))?;
            let doc = parse_reader(BufReader::new(file))
                .with_context(|| format!("reading {:?}", path))?;
            debug!(
                "parsed {:?}: {} days, {} issues",
                path,
                doc.days().len(),
                doc.total_issue_count()
            );
            Ok(doc)
        }
    }

    /* ------------------------- Day-boundary splitter ------------------------- */

    #[derive(Debug, Default)]
    struct DocumentBuilder {
        days: Vec<Day>,
        pending: Vec<String>,
        pending_start: usize,
        line_number: usize,
    }

    impl DocumentBuilder {
        fn push_line(&mut self, line: &str) {
            self.line_number += 1;
            if line.is_empty() {
                self.flush();
            } else {
                if self.pending.is_empty() {
                    self.pending_start = self.line_number;
                }
                self.pending.push(line.to_string());
            }
        }

        fn flush(&mut self) {
            if self.pending.is_empty() {
                return;
            }
            let lines = std::mem::take(&mut self.pending);
            // Blank lines never reach the buffer, so the unchecked assembly applies.
            let day = assemble_day(&lines, self.pending_start);
            debug!(
                "day at line {}: {} lines, {} entries, {} issues",
                day.start_line,
                day.total_line_count,
                day.entries.len(),
                day.total_issue_count
            );
            self.days.push(day);
        }

        fn finish(mut self) -> Document {
            self.flush();
            Document::assemble(self.days, self.line_number)
        }
    }

    /* -------------------------- Day-internal splitter -------------------------- */

    /// Parse one day block. A blank line inside the block is a caller bug and
    /// the only failure; content problems are recorded as issues.
    pub fn parse_day<S: AsRef<str>>(lines: &[S], start_line: usize) -> Result<Day, DomainError> {
        if start_line == 0 {
            return Err(DomainError::ZeroLine);
        }
        if let Some(idx) = lines.iter().position(|l| l.as_ref().is_empty()) {
            return Err(DomainError::BlankLineInDayBlock {
                line: start_line + idx,
            });
        }
        Ok(assemble_day(lines, start_line))
    }

    fn assemble_day<S: AsRef<str>>(lines: &[S], start_line: usize) -> Day {
        let mut draft = DayDraft::new(start_line);
        let mut sub_block: Vec<&str> = Vec::new();
        let mut sub_start = 0;

        for (idx, line) in lines.iter().enumerate() {
            let line = line.as_ref();
            if !sub_block.is_empty() && !is_continuation(line) {
                draft.push_sub_block(&sub_block, start_line + sub_start);
                sub_block.clear();
                sub_start = idx;
            }
            sub_block.push(line);
        }
        if !sub_block.is_empty() {
            draft.push_sub_block(&sub_block, start_line + sub_start);
        }

        draft.freeze()
    }

    fn is_continuation(line: &str) -> bool {
        line.starts_with(['\t', ' '])
    }

    struct DayDraft {
        start_line: usize,
        total_line_count: usize,
        issues: Vec<ParseIssue>,
        total_issue_count: usize,
        intro: Option<Intro>,
        entries: Vec<Entry>,
    }

    impl DayDraft {
        fn new(start_line: usize) -> Self {
            Self {
                start_line,
                total_line_count: 0,
                issues: Vec::new(),
                total_issue_count: 0,
                intro: None,
                entries: Vec::new(),
            }
        }

        fn push_sub_block(&mut self, lines: &[&str], start_line: usize) {
            trace!("sub-block at line {start_line}: {} lines", lines.len());
            if self.intro.is_none() {
                let intro = intro_from_lines(lines, start_line);
                self.total_line_count += intro.total_line_count();
                self.total_issue_count += intro.total_issue_count();
                self.intro = Some(intro);
            } else {
                let entry = entry_from_lines(lines, start_line);
                self.total_line_count += entry.total_line_count();
                self.total_issue_count += entry.total_issue_count();
                self.entries.push(entry);
            }
        }

        fn freeze(mut self) -> Day {
            if self.intro.is_none() {
                self.issues.push(ParseIssue::error(
                    Location::lines(self.start_line, self.start_line + 1),
                    "Day intro not found",
                ));
                self.total_issue_count += 1;
            }
            Day {
                start_line: self.start_line,
                total_line_count: self.total_line_count,
                issues: self.issues,
                total_issue_count: self.total_issue_count,
                intro: self.intro,
                entries: self.entries,
            }
        }
    }

    /* ----------------------------- Intro fields ----------------------------- */

    struct IntroDraft {
        start_line: usize,
        line_count: usize,
        issues: Vec<ParseIssue>,
        skip: Option<SemanticLocatableItem<String>>,
        date: Option<SemanticLocatableItem<NaiveDate>>,
        chapter: Option<SemanticLocatableItem<i32>>,
        comment: Option<SemanticLocatableItem<String>>,
    }

    impl IntroDraft {
        fn freeze(self) -> Intro {
            Intro {
                start_line: self.start_line,
                total_line_count: self.line_count,
                issues: self.issues,
                skip: self.skip,
                date: self.date,
                chapter: self.chapter,
                comment: self.comment,
            }
        }
    }

    /// Extract date/skip, chapter and comment from an intro sub-block.
    /// Line numbers start at 1; content problems are recorded as issues.
    pub fn parse_intro<S: AsRef<str>>(lines: &[S], start_line: usize) -> Result<Intro, DomainError> {
        if start_line == 0 {
            return Err(DomainError::ZeroLine);
        }
        Ok(intro_from_lines(lines, start_line))
    }

    fn intro_from_lines<S: AsRef<str>>(lines: &[S], start_line: usize) -> Intro {
        let mut draft = IntroDraft {
            start_line,
            line_count: lines.len(),
            issues: Vec::new(),
            skip: None,
            date: None,
            chapter: None,
            comment: None,
        };

        let Some(first) = lines.first() else {
            draft.issues.push(ParseIssue::error(
                Location::lines(start_line, start_line),
                "Day intro can't be empty",
            ));
            return draft.freeze();
        };
        if lines.len() > 1 {
            draft.issues.push(ParseIssue::error(
                Location::lines(start_line, start_line + lines.len()),
                "Day intro has to be a single line",
            ));
            // Keep going with the first line.
        }

        let mut fields = first.as_ref().splitn(3, ' ');
        let mut offset = 0;

        let field = fields.next().unwrap_or_default();
        let len = field.chars().count();
        let location = Location::chars(start_line, 1 + offset, len);
        if field == SKIP_MARKER {
            draft.skip = Some(SemanticLocatableItem::at(
                location,
                field.to_string(),
                SemanticClass::Constant,
            ));
        } else {
            match parse_iso_date(field) {
                Ok(date) => {
                    draft.date = Some(SemanticLocatableItem::at(
                        location,
                        date,
                        SemanticClass::Constant,
                    ))
                }
                Err(reason) => draft.issues.push(ParseIssue::error(
                    location,
                    format!("Day intro has invalid date \"{field}\": {reason}"),
                )),
            }
        }
        offset += len + 1;

        match fields.next() {
            Some(field) => {
                let len = field.chars().count();
                let location = Location::chars(start_line, 1 + offset, len);
                match parse_chapter(field) {
                    Ok(chapter) => {
                        draft.chapter = Some(SemanticLocatableItem::at(
                            location,
                            chapter,
                            SemanticClass::Constant,
                        ))
                    }
                    Err(reason) => draft.issues.push(ParseIssue::warning(
                        location,
                        format!("Day intro has unrecognized chapter number \"{field}\": {reason}"),
                    )),
                }
                offset += len + 1;
            }
            None => {
                draft.chapter = Some(SemanticLocatableItem::unlocated(1, SemanticClass::Constant));
            }
        }

        if let Some(field) = fields.next() {
            let len = field.chars().count();
            match parenthesized("Comment", field) {
                Ok(inner) => {
                    // The span covers the text between the parentheses.
                    let location =
                        Location::chars(start_line, 1 + offset + 1, inner.chars().count());
                    draft.comment = Some(SemanticLocatableItem::at(
                        location,
                        inner.to_string(),
                        SemanticClass::Identifier,
                    ));
                }
                Err(reason) => draft.issues.push(ParseIssue::warning(
                    Location::chars(start_line, 1 + offset, len),
                    format!("Day intro has unrecognized comment \"{field}\": {reason}"),
                )),
            }
        }

        draft.freeze()
    }

    /* ----------------------------- Entry fields ----------------------------- */

    struct EntryDraft {
        start_line: usize,
        line_count: usize,
        issues: Vec<ParseIssue>,
        category: Option<SemanticLocatableItem<String>>,
        complement: Option<SemanticLocatableItem<String>>,
        body_lines_count: usize,
    }

    impl EntryDraft {
        fn fail(mut self, location: Location, message: &str) -> Entry {
            self.issues.push(ParseIssue::error(location, message));
            self.category = None;
            self.complement = None;
            self.body_lines_count = 0;
            self.freeze()
        }

        fn freeze(self) -> Entry {
            Entry {
                start_line: self.start_line,
                total_line_count: self.line_count,
                issues: self.issues,
                category: self.category,
                complement: self.complement,
                body_lines_count: self.body_lines_count,
            }
        }
    }

    /// Extract category and complement from an entry sub-block.
    pub fn parse_entry<S: AsRef<str>>(lines: &[S], start_line: usize) -> Result<Entry, DomainError> {
        if start_line == 0 {
            return Err(DomainError::ZeroLine);
        }
        Ok(entry_from_lines(lines, start_line))
    }

    fn entry_from_lines<S: AsRef<str>>(lines: &[S], start_line: usize) -> Entry {
        let draft = EntryDraft {
            start_line,
            line_count: lines.len(),
            issues: Vec::new(),
            category: None,
            complement: None,
            body_lines_count: 0,
        };

        let Some(first) = lines.first() else {
            return draft.fail(
                Location::lines(start_line, start_line),
                "Day entry can't be empty",
            );
        };
        let first = first.as_ref();
        let header_line = Location::lines(start_line, start_line + 1);
        if is_continuation(first) {
            return draft.fail(header_line, "Day entry has to start with a category name");
        }

        let Ok((_, (category, complement, trailing))) = entry_header(first) else {
            return draft.fail(
                header_line,
                "Day entry category/complement unexpectedly missing",
            );
        };
        if category.trim().is_empty() {
            return draft.fail(
                header_line,
                "Day entry category/complement unexpectedly missing",
            );
        }

        let mut draft = draft;
        let category_len = category.chars().count();
        draft.category = Some(SemanticLocatableItem::at(
            Location::chars(start_line, 1, category_len),
            category.to_string(),
            SemanticClass::Type,
        ));

        // Characters consumed before a trailing tab, if any.
        let mut consumed = category_len;
        if let Some(raw) = complement {
            let raw_len = raw.chars().count();
            let lead = raw.chars().take_while(|c| c.is_whitespace()).count();
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                draft.complement = Some(SemanticLocatableItem::at(
                    Location::chars(start_line, category_len + 2 + lead, trimmed.chars().count()),
                    trimmed.to_string(),
                    SemanticClass::Identifier,
                ));
            }
            consumed += 1 + raw_len;
        }

        if let Some(extra) = trailing {
            if !extra.trim().is_empty() {
                draft.issues.push(ParseIssue::warning(
                    Location::chars(start_line, consumed + 1, 1 + extra.chars().count()),
                    "Day entry has trailing unrecognized data",
                ));
            }
        }

        draft.body_lines_count = lines.len() - 1;
        draft.freeze()
    }

    /* ------------------------------ Field grammar ------------------------------ */

    type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

    fn parse_iso_date(field: &str) -> Result<NaiveDate, String> {
        match all_consuming(date_parts)(field) {
            Ok((_, (year, month, day))) => NaiveDate::from_ymd_opt(year, month, day)
                .ok_or_else(|| format!("{year:04}-{month:02}-{day:02} is not a calendar date")),
            Err(_) => Err("expected a date in YYYY-MM-DD format".to_string()),
        }
    }

    fn date_parts(i: &str) -> PResult<'_, (i32, u32, u32)> {
        let (i, (year, _, month, _, day)) = tuple((
            map_res(take_while_m_n(4, 4, char_is_digit), |s: &str| {
                s.parse::<i32>()
            }),
            char('-'),
            map_res(take_while_m_n(2, 2, char_is_digit), |s: &str| {
                s.parse::<u32>()
            }),
            char('-'),
            map_res(take_while_m_n(2, 2, char_is_digit), |s: &str| {
                s.parse::<u32>()
            }),
        ))(i)?;
        Ok((i, (year, month, day)))
    }

    fn char_is_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    fn parse_chapter(field: &str) -> Result<i32, String> {
        let inner = parenthesized("Chapter number", field)?;
        match chapter_number(inner) {
            Ok((_, chapter)) => Ok(chapter),
            Err(_) => Err(format!("\"{inner}\" is not a chapter number")),
        }
    }

    fn chapter_number(i: &str) -> PResult<'_, i32> {
        all_consuming(map_res(
            recognize(pair(opt(one_of("+-")), digit1)),
            |s: &str| s.parse::<i32>(),
        ))(i)
    }

    /// Inner text of `(...)`; `what` names the field in the failure reason.
    fn parenthesized<'a>(what: &str, field: &'a str) -> Result<&'a str, String> {
        if field.chars().count() < 2 {
            return Err(format!("{what} must be enclosed in parentheses"));
        }
        let Some(open) = field.strip_prefix('(') else {
            return Err(format!("{what} opening parenthesis must be '('"));
        };
        let Some(inner) = open.strip_suffix(')') else {
            return Err(format!("{what} closing parenthesis must be ')'"));
        };
        Ok(inner)
    }

    /// `category [" " complement] ["\t" trailing]`; the header ends at the first tab.
    fn entry_header(i: &str) -> PResult<'_, (&str, Option<&str>, Option<&str>)> {
        tuple((
            take_till(|c: char| c == ' ' || c == '\t'),
            opt(preceded(char(' '), take_till(|c: char| c == '\t'))),
            opt(preceded(char('\t'), rest)),
        ))(i)
    }

}

pub mod projectors {
    pub mod dump {
        //! Flat, indented dump of the element tree.

        use crate::tree::{ElementRef, NotesElement};
        use std::fmt::{self, Write};

        #[derive(Debug, Clone, Copy, Default)]
        pub struct DumpOptions {
            /// Print each element's own issues beneath it.
            pub include_issues: bool,
        }

        pub fn dump_tree(root: ElementRef<'_>, opts: DumpOptions) -> String {
            let mut out = String::new();
            // Writing into a String cannot fail.
            let _ = write_dump(&mut out, root, opts);
            out
        }

        pub fn write_dump<W: Write>(out: &mut W, root: ElementRef<'_>, opts: DumpOptions) -> fmt::Result {
            for (depth, el) in root.preorder() {
                let indent = "  ".repeat(depth);
                writeln!(out, "{indent}{}", el.passive_summary())?;
                if opts.include_issues {
                    for issue in el.parse_issues() {
                        writeln!(out, "{indent}  {issue}")?;
                    }
                }
            }
            Ok(())
        }
    }

    pub mod view {
        //! Viewer-facing projections: jump targets and highlight ranges.

        use crate::core::*;
        use crate::tree::{ElementRef, NotesElement};
        use serde::Serialize;
        use std::fmt;

        /// Where a viewer should scroll to / mark for a selected row.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        #[serde(tag = "kind", rename_all = "snake_case")]
        pub enum JumpTarget {
            /// Whole lines `start_line..end_line`.
            Lines { start_line: usize, end_line: usize },
            Characters { location: Location },
        }

        pub fn element_jump(el: &dyn NotesElement) -> JumpTarget {
            let start_line = el.start_line_number();
            JumpTarget::Lines {
                start_line,
                end_line: start_line + el.total_line_count(),
            }
        }

        /// `None` when the issue carries no location.
        pub fn issue_jump(issue: &ParseIssue) -> Option<JumpTarget> {
            let location = issue.location()?;
            if location.has_chars() {
                Some(JumpTarget::Characters { location })
            } else {
                Some(JumpTarget::Lines {
                    start_line: location.start_line(),
                    end_line: location.end_line(),
                })
            }
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        #[serde(tag = "source", content = "value", rename_all = "snake_case")]
        pub enum HighlightKind {
            Semantic(SemanticClass),
            Issue(Severity),
        }

        impl fmt::Display for HighlightKind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    HighlightKind::Semantic(class) => write!(f, "syntax:{class}"),
                    HighlightKind::Issue(severity) => write!(f, "issue:{severity}"),
                }
            }
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        pub struct Highlight {
            pub kind: HighlightKind,
            pub location: Location,
            /// Whole-line range rather than a character range.
            pub line_wise: bool,
        }

        /// Every semantic span (except class `None`) and every located issue, in tree order.
        pub fn collect_highlights(root: ElementRef<'_>) -> Vec<Highlight> {
            let mut out = Vec::new();
            for (_, el) in root.preorder() {
                for span in el.semantic_spans() {
                    if span.class == SemanticClass::None {
                        continue;
                    }
                    out.push(Highlight {
                        kind: HighlightKind::Semantic(span.class),
                        location: span.location,
                        line_wise: !span.location.has_chars(),
                    });
                }
                for issue in el.parse_issues() {
                    if let Some(location) = issue.location() {
                        out.push(Highlight {
                            kind: HighlightKind::Issue(issue.severity()),
                            location,
                            line_wise: !location.has_chars(),
                        });
                    }
                }
            }
            out
        }
    }

    pub mod outline {
        //! Tree-view row model: one row per element, plus one per own issue.

        use super::view::{JumpTarget, element_jump, issue_jump};
        use crate::core::*;
        use crate::tree::{ElementKind, ElementRef, NotesElement};
        use serde::Serialize;

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        #[serde(tag = "row", content = "kind", rename_all = "snake_case")]
        pub enum RowKind {
            Element(ElementKind),
            Issue(Severity),
        }

        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        pub struct OutlineRow {
            pub depth: usize,
            pub kind: RowKind,
            pub summary: String,
            /// Start line for elements; `start-end` for located issues.
            pub start: String,
            pub line_count: String,
            /// Element has issues of its own, or the row is an issue.
            pub flagged: bool,
            /// Total issue count for elements (empty when zero); `<-` for issue rows.
            pub issues: String,
            pub jump: Option<JumpTarget>,
        }

        pub fn outline_rows(root: ElementRef<'_>) -> Vec<OutlineRow> {
            let mut rows = Vec::new();
            for (depth, el) in root.preorder() {
                let total_issues = el.total_issue_count();
                rows.push(OutlineRow {
                    depth,
                    kind: RowKind::Element(el.kind()),
                    summary: el.passive_summary(),
                    start: el.start_line_number().to_string(),
                    line_count: el.total_line_count().to_string(),
                    flagged: !el.parse_issues().is_empty(),
                    issues: if total_issues == 0 {
                        String::new()
                    } else {
                        total_issues.to_string()
                    },
                    jump: Some(element_jump(&el)),
                });
                for issue in el.parse_issues() {
                    rows.push(issue_row(depth + 1, issue));
                }
            }
            rows
        }

        fn issue_row(depth: usize, issue: &ParseIssue) -> OutlineRow {
            let location = issue.location();
            OutlineRow {
                depth,
                kind: RowKind::Issue(issue.severity()),
                summary: issue.to_string(),
                start: location
                    .map(|l| format!("{}-{}", l.start_line(), l.end_line()))
                    .unwrap_or_default(),
                line_count: location
                    .map(|l| l.line_count().to_string())
                    .unwrap_or_default(),
                flagged: true,
                issues: "<-".to_string(),
                jump: issue_jump(issue),
            }
        }

        /// Case-insensitive substring match on row summaries, in tree order.
        pub fn search(root: ElementRef<'_>, query: &str) -> Vec<OutlineRow> {
            let needle = query.to_lowercase();
            outline_rows(root)
                .into_iter()
                .filter(|row| row.summary.to_lowercase().contains(&needle))
                .collect()
        }

        /// An issue together with the element that recorded it.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        pub struct IssueRecord<'a> {
            pub element: ElementKind,
            pub element_start_line: usize,
            pub issue: &'a ParseIssue,
        }

        pub fn collect_issues<'a>(root: ElementRef<'a>) -> Vec<IssueRecord<'a>> {
            let mut out = Vec::new();
            for (_, el) in root.preorder() {
                let issues: &'a [ParseIssue] = match el {
                    ElementRef::Document(_) => &[],
                    ElementRef::Day(day) => day.parse_issues(),
                    ElementRef::Intro(intro) => intro.parse_issues(),
                    ElementRef::Entry(entry) => entry.parse_issues(),
                };
                for issue in issues {
                    out.push(IssueRecord {
                        element: el.kind(),
                        element_start_line: el.start_line_number(),
                        issue,
                    });
                }
            }
            out
        }
    }

    pub mod stats {
        //! Summary statistics over a parsed document.

        use super::outline::collect_issues;
        use crate::core::Severity;
        use crate::tree::Document;
        use chrono::NaiveDate;
        use indexmap::IndexMap;
        use serde::Serialize;

        #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
        pub struct NotesStats {
            pub lines: usize,
            pub days: usize,
            pub skipped_days: usize,
            pub entries: usize,
            pub body_lines: usize,
            pub errors: usize,
            pub warnings: usize,
            pub first_date: Option<NaiveDate>,
            pub last_date: Option<NaiveDate>,
            /// Entry count per category, in order of first appearance.
            pub categories: IndexMap<String, usize>,
        }

        pub fn project_document(doc: &Document) -> NotesStats {
            let mut stats = NotesStats {
                lines: doc.total_line_count,
                days: doc.days().len(),
                ..NotesStats::default()
            };

            for day in doc.days() {
                if let Some(intro) = day.intro() {
                    if intro.is_skip() {
                        stats.skipped_days += 1;
                    }
                    if let Some(date) = intro.date().map(|d| *d.value()) {
                        stats.first_date = Some(stats.first_date.map_or(date, |d| d.min(date)));
                        stats.last_date = Some(stats.last_date.map_or(date, |d| d.max(date)));
                    }
                }
                for entry in day.entries() {
                    stats.entries += 1;
                    stats.body_lines += entry.body_lines_count();
                    if let Some(category) = entry.category() {
                        *stats.categories.entry(category.value().clone()).or_default() += 1;
                    }
                }
            }

            for record in collect_issues(doc.element()) {
                match record.issue.severity() {
                    Severity::Error => stats.errors += 1,
                    Severity::Warning => stats.warnings += 1,
                }
            }
            stats
        }
    }

    #[cfg(test)]
    mod tests {
        use super::dump::{DumpOptions, dump_tree};
        use super::outline::{RowKind, collect_issues, outline_rows, search};
        use super::stats::project_document;
        use super::view::{HighlightKind, JumpTarget, collect_highlights, issue_jump};
        use crate::core::{Location, SemanticClass, Severity};
        use crate::parse_str;
        use crate::tree::{ElementKind, NotesElement};
        use chrono::NaiveDate;
        use pretty_assertions::assert_eq;

        const SAMPLE: &str = "2016-09-15\nfoo bar baz\n\tblubber\nquux\n\n[...] (x)\nsw\n";

        #[test]
        fn dump_indents_by_depth() {
            let doc = parse_str(SAMPLE);
            let expected = "\
Notes with 2 days
  2016-09-15: 2 entries
    Date 2016-09-15, chapter 1, comment: (none)
    Category foo / \"bar baz\"; body lines count 1
    Category quux; body lines count 0
  [...]: 1 entries
    Skip, chapter (missing), comment: (none)
    Category sw; body lines count 0
";
            assert_eq!(dump_tree(doc.element(), DumpOptions::default()), expected);
        }

        #[test]
        fn dump_can_include_issue_lines() {
            let doc = parse_str("[...] (x)\n");
            let dumped = dump_tree(
                doc.element(),
                DumpOptions {
                    include_issues: true,
                },
            );
            let last = dumped.lines().last().expect("line");
            assert!(last.starts_with("      Warning: Day intro has unrecognized chapter number \"(x)\""));
        }

        #[test]
        fn outline_has_a_row_per_element_and_issue() {
            let doc = parse_str(SAMPLE);
            let rows = outline_rows(doc.element());
            assert_eq!(rows.len(), 8 + doc.total_issue_count());

            let issue_row = rows
                .iter()
                .find(|r| matches!(r.kind, RowKind::Issue(Severity::Warning)))
                .expect("issue row");
            assert_eq!(issue_row.start, "6-6");
            assert_eq!(issue_row.line_count, "1");
            assert_eq!(issue_row.issues, "<-");
            assert_eq!(issue_row.depth, 3);

            let root = &rows[0];
            assert_eq!(root.kind, RowKind::Element(ElementKind::Document));
            assert_eq!(root.issues, "1");
            assert!(!root.flagged);
            assert_eq!(
                root.jump,
                Some(JumpTarget::Lines {
                    start_line: 1,
                    end_line: 8
                })
            );
        }

        #[test]
        fn search_is_case_insensitive() {
            let doc = parse_str(SAMPLE);
            let hits = search(doc.element(), "CATEGORY Q");
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].start, "4");
            assert!(search(doc.element(), "nothing like it").is_empty());
        }

        #[test]
        fn highlights_cover_spans_and_issues() {
            let doc = parse_str(SAMPLE);
            let highlights = collect_highlights(doc.element());
            let issues: Vec<_> = highlights
                .iter()
                .filter(|h| matches!(h.kind, HighlightKind::Issue(_)))
                .collect();
            assert_eq!(issues.len(), 1);
            assert!(!issues[0].line_wise);
            assert!(highlights.iter().any(|h| h.kind
                == HighlightKind::Semantic(SemanticClass::Type)
                && h.location == Location::chars(2, 1, 3)));
            for h in &highlights {
                assert!(h.location.start_line() >= 1);
                assert!(h.location.last_line() <= doc.total_line_count());
            }
        }

        #[test]
        fn issue_jump_prefers_character_ranges() {
            let doc = parse_str("2016-09-15\nfoo\n\tbody\n\nnot-a-date\n");
            let records = collect_issues(doc.element());
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].element, ElementKind::Intro);
            assert_eq!(records[0].element_start_line, 5);
            assert_eq!(
                issue_jump(records[0].issue),
                Some(JumpTarget::Characters {
                    location: Location::chars(5, 1, 10)
                })
            );
        }

        #[test]
        fn stats_count_categories_in_first_seen_order() {
            let doc = parse_str(
                "2016-09-18\ndevelop a\n\t* a\nsw x\ndevelop b\n\n2016-09-16 (2)\nsw y\n\n[...]\n",
            );
            let stats = project_document(&doc);
            assert_eq!(stats.days, 3);
            assert_eq!(stats.skipped_days, 1);
            assert_eq!(stats.entries, 4);
            assert_eq!(stats.body_lines, 1);
            assert_eq!(
                stats.categories.iter().map(|(k, v)| (k.as_str(), *v)).collect::<Vec<_>>(),
                vec![("develop", 2), ("sw", 2)]
            );
            assert_eq!(stats.first_date, NaiveDate::from_ymd_opt(2016, 9, 16));
            assert_eq!(stats.last_date, NaiveDate::from_ymd_opt(2016, 9, 18));
            assert_eq!((stats.errors, stats.warnings), (0, 0));
        }
    }
}

pub use parser::{FileNotesParser, NotesParser, parse_lines, parse_reader, parse_str};
pub use projectors::dump::{DumpOptions, dump_tree};
