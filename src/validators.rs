use chrono::{Datelike, NaiveDate, Utc};

pub const PLATE_MIN_LEN: usize = 4;
pub const PLATE_MAX_LEN: usize = 12;
pub const YEAR_MIN: i32 = 1950;
pub const AGE_MIN: i32 = 14;
pub const AGE_MAX: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Empty,
    PlateChars,
    PlateLength,
    DateGrammar,
    DateImpossible,
    DateAge,
    YearFormat,
    YearRange { min: i32, max: i32 },
}

impl ValidationError {
    /// Текст для повторного запроса того же шага
    pub fn message(&self) -> String {
        match self {
            ValidationError::Empty => "Поле не может быть пустым, напишите текстом".to_string(),
            ValidationError::PlateChars => {
                "Номер может содержать только латинские буквы и цифры, например A123BC77".to_string()
            }
            ValidationError::PlateLength => format!(
                "Номер должен быть от {} до {} символов",
                PLATE_MIN_LEN, PLATE_MAX_LEN
            ),
            ValidationError::DateGrammar => {
                "Дата в формате ДД.ММ.ГГГГ, например 09.05.1985".to_string()
            }
            ValidationError::DateImpossible => "Такой даты не существует, проверьте день и месяц".to_string(),
            ValidationError::DateAge => "Проверьте год: возраст выглядит неправдоподобно".to_string(),
            ValidationError::YearFormat => "Год выпуска цифрами, например 2015".to_string(),
            ValidationError::YearRange { min, max } => {
                format!("Год выпуска от {} до {}", min, max)
            }
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Нормализация госномера: трим, верхний регистр, только A-Z0-9,
/// длина 4..=12. Все сравнения и записи идут по этому виду.
pub fn normalize_plate(input: &str) -> Result<String, ValidationError> {
    let normalized: String = input.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !normalized
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err(ValidationError::PlateChars);
    }
    if normalized.len() < PLATE_MIN_LEN || normalized.len() > PLATE_MAX_LEN {
        return Err(ValidationError::PlateLength);
    }
    Ok(normalized)
}

/// Дата рождения: строгий разбор ДД.ММ.ГГГГ, проверка календаря
/// и правдоподобного возраста. Хранится как ISO-дата.
pub fn parse_birth_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() != 3 || parts[0].len() != 2 || parts[1].len() != 2 || parts[2].len() != 4 {
        return Err(ValidationError::DateGrammar);
    }
    let day: u32 = parts[0].parse().map_err(|_| ValidationError::DateGrammar)?;
    let month: u32 = parts[1].parse().map_err(|_| ValidationError::DateGrammar)?;
    let year: i32 = parts[2].parse().map_err(|_| ValidationError::DateGrammar)?;

    // 31.04 и подобные отсекает сам календарь
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(ValidationError::DateImpossible)?;

    let today = Utc::now().date_naive();
    let age = today.year() - year;
    if age < AGE_MIN || age > AGE_MAX {
        return Err(ValidationError::DateAge);
    }
    Ok(date)
}

/// Год выпуска: не раньше фиксированного минимума и не дальше
/// следующего календарного года.
pub fn validate_model_year(input: &str) -> Result<i32, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty);
    }
    let year: i32 = trimmed.parse().map_err(|_| ValidationError::YearFormat)?;
    let max = Utc::now().year() + 1;
    if year < YEAR_MIN || year > max {
        return Err(ValidationError::YearRange { min: YEAR_MIN, max });
    }
    Ok(year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn plate_is_uppercased_and_trimmed() {
        assert_eq!(normalize_plate(" a123bc77 ").unwrap(), "A123BC77");
        assert_eq!(normalize_plate("x001xx").unwrap(), "X001XX");
    }

    #[test]
    fn plate_rejects_bad_input() {
        assert_eq!(normalize_plate("AB 12"), Err(ValidationError::PlateChars));
        assert_eq!(normalize_plate("AB1"), Err(ValidationError::PlateLength));
        assert_eq!(
            normalize_plate("A123456789012"),
            Err(ValidationError::PlateLength)
        );
        assert_eq!(normalize_plate("А123ВС"), Err(ValidationError::PlateChars)); // кириллица
        assert_eq!(normalize_plate("   "), Err(ValidationError::Empty));
    }

    #[test]
    fn birth_date_happy_path() {
        let date = parse_birth_date("09.05.1985").unwrap();
        assert_eq!((date.day(), date.month(), date.year()), (9, 5, 1985));
        assert_eq!(date.to_string(), "1985-05-09");
    }

    #[test]
    fn birth_date_rejects_grammar_and_calendar() {
        assert_eq!(parse_birth_date("9.5.1985"), Err(ValidationError::DateGrammar));
        assert_eq!(parse_birth_date("1985-05-09"), Err(ValidationError::DateGrammar));
        assert_eq!(parse_birth_date("31.04.1990"), Err(ValidationError::DateImpossible));
        assert_eq!(parse_birth_date("29.02.1999"), Err(ValidationError::DateImpossible));
    }

    #[test]
    fn birth_date_rejects_implausible_age() {
        let this_year = Utc::now().year();
        assert_eq!(
            parse_birth_date(&format!("01.01.{}", this_year - 5)),
            Err(ValidationError::DateAge)
        );
        assert_eq!(
            parse_birth_date(&format!("01.01.{}", this_year - 150)),
            Err(ValidationError::DateAge)
        );
    }

    #[test]
    fn model_year_bounds() {
        let next = Utc::now().year() + 1;
        assert_eq!(validate_model_year("2015").unwrap(), 2015);
        assert_eq!(validate_model_year(&next.to_string()).unwrap(), next);
        assert!(matches!(
            validate_model_year(&(next + 1).to_string()),
            Err(ValidationError::YearRange { .. })
        ));
        assert!(matches!(
            validate_model_year("1949"),
            Err(ValidationError::YearRange { .. })
        ));
        assert_eq!(validate_model_year("today"), Err(ValidationError::YearFormat));
    }
}
