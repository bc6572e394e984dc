use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::{debug, info};
use scraper::{ElementRef, Html, Selector};

use super::{ParsedBlock, ParsedSession, PlannerMarkup, RawExercise};
use crate::errors::{GymError, Result};
use crate::workbook::sheet_name_problem;

fn class_selector(class: &str) -> Result<Selector> {
    Selector::parse(&format!(".{class}"))
        .map_err(|e| GymError::parse(format!("invalid class '{class}': {e:?}")))
}

fn first_class<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    element
        .value()
        .attr("class")
        .and_then(|classes| classes.split_whitespace().next())
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

struct Selectors {
    session: Selector,
    title: Selector,
    day: Selector,
    month: Selector,
    year: Selector,
    body: Selector,
    field: Selector,
}

impl Selectors {
    fn new(markup: &PlannerMarkup) -> Result<Self> {
        Ok(Self {
            session: class_selector(&markup.session)?,
            title: class_selector(&markup.title)?,
            day: class_selector(&markup.day)?,
            month: class_selector(&markup.month)?,
            year: class_selector(&markup.year)?,
            body: class_selector(&markup.body)?,
            field: Selector::parse("div")
                .map_err(|e| GymError::parse(format!("invalid field selector: {e:?}")))?,
        })
    }
}

/// Parse a planner file; the block takes the file's base name.
pub fn parse_file(path: &Path, markup: &PlannerMarkup) -> Result<ParsedBlock> {
    let html = fs::read_to_string(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| GymError::parse(format!("{} has no usable file name", path.display())))?;
    if let Some(problem) = sheet_name_problem(name) {
        return Err(GymError::parse(format!(
            "{}: block name '{name}' {problem} and cannot be used as a sheet name",
            path.display()
        )));
    }
    let block = parse_document(&html, name, markup)?;
    info!(
        "Parsed {} sessions from {}",
        block.sessions.len(),
        path.display()
    );
    Ok(block)
}

pub fn parse_document(html: &str, block_name: &str, markup: &PlannerMarkup) -> Result<ParsedBlock> {
    let selectors = Selectors::new(markup)?;
    let document = Html::parse_document(html);

    let sessions = document
        .select(&selectors.session)
        .enumerate()
        .map(|(i, session)| parse_session(i + 1, session, &selectors, markup))
        .collect::<Result<Vec<_>>>()?;

    if sessions.is_empty() {
        return Err(GymError::parse(format!(
            "no '.{}' session containers in {block_name}",
            markup.session
        )));
    }

    Ok(ParsedBlock {
        name: block_name.to_string(),
        sessions,
    })
}

fn find<'a>(
    scope: ElementRef<'a>,
    selector: &Selector,
    class: &str,
    position: usize,
) -> Result<ElementRef<'a>> {
    scope.select(selector).next().ok_or_else(|| {
        GymError::parse(format!("session {position}: missing '.{class}' container"))
    })
}

fn date_component<T: std::str::FromStr>(
    scope: ElementRef<'_>,
    selector: &Selector,
    class: &str,
    position: usize,
) -> Result<T> {
    let raw = text_of(&find(scope, selector, class, position)?);
    raw.parse().map_err(|_| {
        GymError::parse(format!(
            "session {position}: '.{class}' is not an integer ('{raw}')"
        ))
    })
}

fn parse_session(
    position: usize,
    session: ElementRef<'_>,
    selectors: &Selectors,
    markup: &PlannerMarkup,
) -> Result<ParsedSession> {
    let description = text_of(&find(session, &selectors.title, &markup.title, position)?).to_lowercase();

    let day: u32 = date_component(session, &selectors.day, &markup.day, position)?;
    let month: u32 = date_component(session, &selectors.month, &markup.month, position)?;
    let year: i32 = date_component(session, &selectors.year, &markup.year, position)?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        GymError::parse(format!(
            "session {position}: {year}-{month}-{day} is not a calendar date"
        ))
    })?;

    let body = find(session, &selectors.body, &markup.body, position)?;
    let exercises = body
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|entry| {
            entry
                .value()
                .classes()
                .any(|class| class.starts_with(markup.entry_prefix.as_str()))
        })
        .map(|entry| {
            entry
                .select(&selectors.field)
                .filter_map(|field| first_class(&field).map(|tag| (tag, text_of(&field))))
                .collect::<RawExercise>()
        })
        .collect::<Vec<_>>();

    debug!(
        "Session {position} '{description}' on {date}: {} exercises",
        exercises.len()
    );

    Ok(ParsedSession {
        description,
        date,
        exercises,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::SAMPLE_PLANNER;

    #[test]
    fn parses_sessions_dates_and_fields() {
        let block = parse_document(SAMPLE_PLANNER, "week 1", &PlannerMarkup::default()).unwrap();

        assert_eq!(block.name, "week 1");
        assert_eq!(block.sessions.len(), 2);

        let lower = &block.sessions[0];
        assert_eq!(lower.description, "lower body");
        assert_eq!(lower.date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(lower.exercises.len(), 2);
        assert_eq!(lower.exercises[0].get("name"), Some("Back Squat"));
        assert_eq!(lower.exercises[0].get("series"), Some("3 series"));
        assert_eq!(
            lower.exercises[0].tags().collect::<Vec<_>>(),
            vec!["name", "series", "load", "weight", "reps", "rpe", "rest"]
        );

        assert_eq!(
            block.sessions[1].date,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
    }

    #[test]
    fn non_exercise_children_are_ignored() {
        let html = r#"
            <div class="day">
              <div class="title">Cardio</div>
              <div class="day-number">2</div><div class="month-number">2</div><div class="year-number">2024</div>
              <div class="day-body">
                <div class="note"><div class="name">warm up</div></div>
                <div class="exercise"><div class="name">Row</div></div>
              </div>
            </div>"#;
        let block = parse_document(html, "w", &PlannerMarkup::default()).unwrap();
        let exercises = &block.sessions[0].exercises;
        assert_eq!(exercises.len(), 1);
        assert_eq!(exercises[0].get("name"), Some("Row"));
    }

    #[test]
    fn missing_body_names_the_container() {
        let html = r#"
            <div class="day">
              <div class="title">Legs</div>
              <div class="day-number">8</div><div class="month-number">1</div><div class="year-number">2024</div>
            </div>"#;
        let err = parse_document(html, "w", &PlannerMarkup::default()).unwrap_err();
        assert!(matches!(err, GymError::Parse(ref msg) if msg.contains("day-body")));
    }

    #[test]
    fn impossible_date_is_rejected() {
        let html = r#"
            <div class="day">
              <div class="title">Legs</div>
              <div class="day-number">31</div><div class="month-number">2</div><div class="year-number">2024</div>
              <div class="day-body"></div>
            </div>"#;
        let err = parse_document(html, "w", &PlannerMarkup::default()).unwrap_err();
        assert!(matches!(err, GymError::Parse(ref msg) if msg.contains("calendar date")));
    }

    #[test]
    fn document_without_sessions_is_rejected() {
        let err = parse_document("<p>nothing</p>", "w", &PlannerMarkup::default()).unwrap_err();
        assert!(matches!(err, GymError::Parse(_)));
    }

    #[test]
    fn file_names_that_cannot_title_a_sheet_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("week 1 [deload].html");
        fs::write(&path, SAMPLE_PLANNER).unwrap();

        let err = parse_file(&path, &PlannerMarkup::default()).unwrap_err();
        assert!(
            matches!(err, GymError::Parse(ref msg) if msg.contains("week 1 [deload].html"))
        );
    }
}
