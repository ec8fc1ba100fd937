use serde::{Deserialize, Serialize};

/// JS `Math.round(x * 100) / 100` parity for the non-negative scores we
/// handle: `floor(100x + 0.5) / 100`.
pub fn round_off_2_decimals(x: f64) -> f64 {
    ((100.0 * x) + 0.5).floor() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Mid1,
    Mid2,
    Assignment1,
    Assignment2,
    Quiz,
    Attendance,
}

impl ExamType {
    pub fn parse(tag: &str) -> Option<ExamType> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "mid1" => Some(ExamType::Mid1),
            "mid2" => Some(ExamType::Mid2),
            "assignment1" => Some(ExamType::Assignment1),
            "assignment2" => Some(ExamType::Assignment2),
            "quiz" => Some(ExamType::Quiz),
            "attendance" => Some(ExamType::Attendance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Mid1 => "mid1",
            ExamType::Mid2 => "mid2",
            ExamType::Assignment1 => "assignment1",
            ExamType::Assignment2 => "assignment2",
            ExamType::Quiz => "quiz",
            ExamType::Attendance => "attendance",
        }
    }
}

/// Maximum score per exam type. Injected rather than hardcoded so a
/// workspace can override it; defaults follow the institution scheme
/// (quiz is canonically out of 10).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkScheme {
    pub mid1: f64,
    pub mid2: f64,
    pub assignment1: f64,
    pub assignment2: f64,
    pub quiz: f64,
    pub attendance: f64,
}

impl Default for MarkScheme {
    fn default() -> Self {
        Self {
            mid1: 20.0,
            mid2: 20.0,
            assignment1: 10.0,
            assignment2: 10.0,
            quiz: 10.0,
            attendance: 5.0,
        }
    }
}

impl MarkScheme {
    pub fn max_for(&self, exam: ExamType) -> f64 {
        match exam {
            ExamType::Mid1 => self.mid1,
            ExamType::Mid2 => self.mid2,
            ExamType::Assignment1 => self.assignment1,
            ExamType::Assignment2 => self.assignment2,
            ExamType::Quiz => self.quiz,
            ExamType::Attendance => self.attendance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttendanceConfig {
    pub total_semester_classes: i64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            total_semester_classes: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scheme: MarkScheme,
    pub attendance: AttendanceConfig,
}

/// Fixed-shape per-student score record. Every exam type is always
/// present; types with no stored mark stay at 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ExamScoreSet {
    pub mid1: f64,
    pub mid2: f64,
    pub assignment1: f64,
    pub assignment2: f64,
    pub quiz: f64,
    pub attendance: f64,
}

impl ExamScoreSet {
    pub fn get(&self, exam: ExamType) -> f64 {
        match exam {
            ExamType::Mid1 => self.mid1,
            ExamType::Mid2 => self.mid2,
            ExamType::Assignment1 => self.assignment1,
            ExamType::Assignment2 => self.assignment2,
            ExamType::Quiz => self.quiz,
            ExamType::Attendance => self.attendance,
        }
    }

    pub fn set(&mut self, exam: ExamType, score: f64) {
        match exam {
            ExamType::Mid1 => self.mid1 = score,
            ExamType::Mid2 => self.mid2 = score,
            ExamType::Assignment1 => self.assignment1 = score,
            ExamType::Assignment2 => self.assignment2 = score,
            ExamType::Quiz => self.quiz = score,
            ExamType::Attendance => self.attendance = score,
        }
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ExamType, f64)>,
    {
        let mut set = ExamScoreSet::default();
        for (exam, score) in pairs {
            set.set(exam, score);
        }
        set
    }

    /// Normalize raw `(tag, score)` rows as read from storage. Tags that
    /// are not a known exam type are dropped; the read path stays
    /// permissive while the write path validates.
    pub fn from_tagged<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        Self::from_pairs(
            rows.into_iter()
                .filter_map(|(tag, score)| ExamType::parse(tag).map(|e| (e, score))),
        )
    }
}

/// 2/3 weight to the better mid-term, 1/3 to the weaker. Unrounded; a
/// score of 0 is a real mark, not a missing one.
pub fn weighted_mid_term_raw(mid1: f64, mid2: f64) -> f64 {
    let hi = mid1.max(mid2);
    let lo = mid1.min(mid2);
    hi * (2.0 / 3.0) + lo * (1.0 / 3.0)
}

pub fn weighted_mid_term(mid1: f64, mid2: f64) -> f64 {
    round_off_2_decimals(weighted_mid_term_raw(mid1, mid2))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub weighted_mid_marks: f64,
    pub total_marks: f64,
}

/// The total sums the unrounded weighted mid with the remaining
/// components, then rounds once. No upper-bound check here; bounds are
/// enforced at write time.
pub fn score_summary(scores: &ExamScoreSet) -> ScoreSummary {
    let weighted = weighted_mid_term_raw(scores.mid1, scores.mid2);
    let total =
        weighted + scores.assignment1 + scores.assignment2 + scores.quiz + scores.attendance;
    ScoreSummary {
        weighted_mid_marks: weighted_mid_term(scores.mid1, scores.mid2),
        total_marks: round_off_2_decimals(total),
    }
}

/// Percentage over the semester's expected class count. No clamping:
/// inconsistent upstream data may push this past 100.
pub fn attendance_percentage(attended: i64, total_classes: i64) -> f64 {
    if total_classes <= 0 {
        return 0.0;
    }
    round_off_2_decimals((attended as f64) / (total_classes as f64) * 100.0)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAggregate {
    pub student_id: String,
    pub roll_number: String,
    pub name: String,
    pub exam_marks: ExamScoreSet,
    pub weighted_mid_marks: f64,
    pub total_marks: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStat {
    pub student_id: String,
    pub roll_number: String,
    pub name: String,
    pub total_semester_classes: i64,
    pub attended_classes: i64,
    pub attendance_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterDirection {
    Above,
    Below,
}

impl FilterDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterDirection::Above => "above",
            FilterDirection::Below => "below",
        }
    }
}

/// Raw optional filter fields as they arrive on a request. Presence is
/// tracked with `Option` so a threshold of exactly 0 is still a
/// threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterParams {
    pub threshold: Option<f64>,
    pub filter: Option<FilterDirection>,
    pub min_threshold: Option<f64>,
    pub max_threshold: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterCriteria {
    Unfiltered,
    Threshold {
        value: f64,
        direction: FilterDirection,
    },
    Range {
        min: f64,
        max: f64,
    },
}

impl FilterCriteria {
    /// Range beats single threshold when both are supplied. That priority
    /// is part of the contract, not an accident of branch order.
    pub fn from_params(params: &FilterParams) -> FilterCriteria {
        if let (Some(min), Some(max)) = (params.min_threshold, params.max_threshold) {
            return FilterCriteria::Range { min, max };
        }
        if let (Some(value), Some(direction)) = (params.threshold, params.filter) {
            return FilterCriteria::Threshold { value, direction };
        }
        FilterCriteria::Unfiltered
    }

    pub fn keeps(&self, value: f64) -> bool {
        match self {
            FilterCriteria::Unfiltered => true,
            FilterCriteria::Range { min, max } => value >= *min && value <= *max,
            FilterCriteria::Threshold {
                value: threshold,
                direction,
            } => match direction {
                FilterDirection::Above => value >= *threshold,
                FilterDirection::Below => value < *threshold,
            },
        }
    }
}

pub fn filter_stats<T, F>(stats: Vec<T>, criteria: &FilterCriteria, metric: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    stats
        .into_iter()
        .filter(|s| criteria.keeps(metric(s)))
        .collect()
}

pub fn parse_filter_params(params: &serde_json::Value) -> Result<FilterParams, CalcError> {
    let threshold = parse_optional_number(params, "threshold")?;
    let min_threshold = parse_optional_number(params, "minThreshold")?;
    let max_threshold = parse_optional_number(params, "maxThreshold")?;

    let filter = match params.get("filter") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(CalcError::new("bad_params", "filter must be a string"));
            };
            match s.to_ascii_lowercase().as_str() {
                "above" => Some(FilterDirection::Above),
                "below" => Some(FilterDirection::Below),
                _ => {
                    return Err(CalcError::new(
                        "bad_params",
                        "filter must be 'above' or 'below'",
                    ))
                }
            }
        }
    };

    Ok(FilterParams {
        threshold,
        filter,
        min_threshold,
        max_threshold,
    })
}

fn parse_optional_number(params: &serde_json::Value, key: &str) -> Result<Option<f64>, CalcError> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| CalcError::new("bad_params", format!("{} must be a number", key))),
    }
}

/// Which value the filter compares against for marks requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkMetric {
    Total,
    Exam(ExamType),
}

impl MarkMetric {
    pub fn of(&self, exam_marks: &ExamScoreSet, total_marks: f64) -> f64 {
        match self {
            MarkMetric::Total => total_marks,
            MarkMetric::Exam(exam) => exam_marks.get(*exam),
        }
    }
}

pub fn parse_mark_metric(params: &serde_json::Value) -> Result<MarkMetric, CalcError> {
    match params.get("examType") {
        None => Ok(MarkMetric::Total),
        Some(v) if v.is_null() => Ok(MarkMetric::Total),
        Some(v) => {
            let Some(s) = v.as_str() else {
                return Err(CalcError::new("bad_params", "examType must be a string"));
            };
            if s.eq_ignore_ascii_case("total") {
                return Ok(MarkMetric::Total);
            }
            ExamType::parse(s)
                .map(MarkMetric::Exam)
                .ok_or_else(|| CalcError::new("bad_params", format!("unknown examType: {}", s)))
        }
    }
}
