//! Shared fixtures for unit tests.

use crate::parser::{ParsedBlock, PlannerMarkup, parse_document};

/// Two sessions, three exercise rows, six sets in total once expanded.
pub const SAMPLE_PLANNER: &str = r#"<!DOCTYPE html>
<html>
<body>
  <div class="week">
    <div class="day">
      <div class="header">
        <div class="title"> Lower Body </div>
        <div class="date">
          <div class="day-number">8</div>
          <div class="month-number">1</div>
          <div class="year-number">2024</div>
        </div>
      </div>
      <div class="day-body">
        <div class="exercise-row">
          <div class="name">Back Squat</div>
          <div class="series">3 series</div>
          <div class="load">75%</div>
          <div class="weight">100 kg</div>
          <div class="reps">5 reps</div>
          <div class="rpe">RPE 8</div>
          <div class="rest">3 min</div>
        </div>
        <div class="exercise-row">
          <div class="name">Romanian Deadlift</div>
          <div class="series">2 series</div>
          <div class="load">0%</div>
          <div class="weight">80 kg</div>
          <div class="reps">8 reps</div>
          <div class="rpe">RPE 7</div>
          <div class="rest">2 min</div>
        </div>
      </div>
    </div>
    <div class="day">
      <div class="header">
        <div class="title">Upper Body</div>
        <div class="date">
          <div class="day-number">10</div>
          <div class="month-number">1</div>
          <div class="year-number">2024</div>
        </div>
      </div>
      <div class="day-body">
        <div class="exercise-row">
          <div class="name">Bench Press</div>
          <div class="series">1 series</div>
          <div class="load">70%</div>
          <div class="weight">80 kg</div>
          <div class="reps">6 reps</div>
          <div class="rpe">RPE 8</div>
          <div class="rest">0 min</div>
        </div>
      </div>
    </div>
  </div>
</body>
</html>
"#;

pub fn sample_block(name: &str) -> ParsedBlock {
    parse_document(SAMPLE_PLANNER, name, &PlannerMarkup::default())
        .expect("sample planner parses")
}
