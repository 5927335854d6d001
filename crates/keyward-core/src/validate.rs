//! Field validation shared by the registries and the API layer.
//!
//! Limits and character classes mirror the institutional policy the system
//! was built around: numeric key tags, short alphanumeric series ids, and
//! pids long enough to hold an email address used as a mock identifier.

use crate::{Error, Result};

pub const MAX_SERIES_LEN: usize = 10;
pub const MIN_SEQUENCE: i64 = 1;
pub const MAX_SEQUENCE: i64 = 9999;
pub const MAX_BUILDING_LEN: usize = 20;
pub const MAX_LOCATION_LEN: usize = 15;
pub const MIN_PID_LEN: usize = 3;
pub const MAX_PID_LEN: usize = 320;
pub const MAX_FULL_NAME_LEN: usize = 60;
pub const MAX_COMMENT_LEN: usize = 240;

fn fail(msg: impl Into<String>) -> Error { Error::Validation(msg.into()) }

/// A tag number is one or more digits, optionally with embedded dots
/// (e.g. `101`, `101.2`). The first character must be a digit.
pub fn tag_number(s: &str) -> Result<()> {
  let mut chars = s.chars();
  let valid = matches!(chars.next(), Some(c) if c.is_ascii_digit())
    && chars.all(|c| c.is_ascii_digit() || c == '.');
  if valid {
    Ok(())
  } else {
    Err(fail(format!("tag number {s:?} must be numeric (dots allowed)")))
  }
}

pub fn series_id(s: &str) -> Result<()> {
  if s.is_empty() || s.len() > MAX_SERIES_LEN {
    return Err(fail(format!(
      "series id must be 1-{MAX_SERIES_LEN} characters"
    )));
  }
  if s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
    Ok(())
  } else {
    Err(fail(format!(
      "series id {s:?} may only contain letters, digits and hyphens"
    )))
  }
}

pub fn sequence_id(n: i64) -> Result<()> {
  if (MIN_SEQUENCE..=MAX_SEQUENCE).contains(&n) {
    Ok(())
  } else {
    Err(fail(format!(
      "sequence id must be between {MIN_SEQUENCE} and {MAX_SEQUENCE}"
    )))
  }
}

pub fn building(s: &str) -> Result<()> {
  if s.is_empty() || s.len() > MAX_BUILDING_LEN {
    return Err(fail(format!(
      "building must be 1-{MAX_BUILDING_LEN} characters"
    )));
  }
  if s
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
  {
    Ok(())
  } else {
    Err(fail(format!(
      "building {s:?} may only contain letters, digits, hyphens and spaces"
    )))
  }
}

/// Validate a full location list. Keys are often cut for more than one door,
/// so a key carries one or more location tags.
pub fn locations(tags: &[String]) -> Result<()> {
  if tags.is_empty() {
    return Err(fail("at least one location is required"));
  }
  for tag in tags {
    if tag.is_empty() || tag.len() > MAX_LOCATION_LEN {
      return Err(fail(format!(
        "each location must be 1-{MAX_LOCATION_LEN} characters"
      )));
    }
    if !tag
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == ' ')
    {
      return Err(fail(format!(
        "location {tag:?} may only contain letters, digits, hyphens and spaces"
      )));
    }
  }
  Ok(())
}

pub fn pid(s: &str) -> Result<()> {
  if (MIN_PID_LEN..=MAX_PID_LEN).contains(&s.len()) {
    Ok(())
  } else {
    Err(fail(format!(
      "pid must be {MIN_PID_LEN}-{MAX_PID_LEN} characters"
    )))
  }
}

pub fn full_name(s: &str) -> Result<()> {
  if s.is_empty() || s.len() > MAX_FULL_NAME_LEN {
    return Err(fail(format!(
      "full name must be 1-{MAX_FULL_NAME_LEN} characters"
    )));
  }
  if s.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
    Ok(())
  } else {
    Err(fail(format!(
      "full name {s:?} may only contain letters and spaces"
    )))
  }
}

pub fn comment(s: &str) -> Result<()> {
  if s.len() <= MAX_COMMENT_LEN {
    Ok(())
  } else {
    Err(fail(format!("comment must be at most {MAX_COMMENT_LEN} characters")))
  }
}

/// Syntactic email check: one `@`, a non-empty local part, and a domain with
/// at least one dot. Deliverability is the mail system's problem.
pub fn email(s: &str) -> Result<()> {
  let valid = match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
        && !s.chars().any(char::is_whitespace)
    }
    None => false,
  };
  if valid {
    Ok(())
  } else {
    Err(fail(format!("{s:?} is not a valid email address")))
  }
}
