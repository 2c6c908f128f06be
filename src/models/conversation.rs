use teloxide::types::ChatId;

/// Активный диалог пользователя. Живёт только в памяти процесса,
/// при рестарте теряется.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub chat_id: ChatId,
    pub flow: FlowState,
}

/// Какой сценарий сейчас идёт и на каком он шаге. Данные шага лежат
/// рядом с шагом, поэтому обращение к несобранному полю не компилируется.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Registration { step: RegStep, data: RegData },
    AddCar { step: AddCarStep, data: AddCarData },
    Invite { step: InviteStep, data: InviteData },
    EditProfile { field: ProfileField },
    EditCar { car_id: i64, field: CarField, photos: Vec<String> },
    SetStatus { step: SetStatusStep },
    SetPassword,
    Activate,
    Search,
}

impl FlowState {
    /// Название сценария для сообщения об отмене
    pub fn title(&self) -> &'static str {
        match self {
            FlowState::Registration { .. } => "Регистрация",
            FlowState::AddCar { .. } => "Добавление авто",
            FlowState::Invite { .. } => "Создание приглашения",
            FlowState::EditProfile { .. } => "Редактирование профиля",
            FlowState::EditCar { .. } => "Редактирование авто",
            FlowState::SetStatus { .. } => "Смена статуса",
            FlowState::SetPassword => "Установка пароля",
            FlowState::Activate => "Активация",
            FlowState::Search => "Поиск по номеру",
        }
    }
}

// ---------------------------------------------------------------------------
// Регистрация

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegStep {
    Name,
    LastName,
    BirthDate,
    City,
    Country,
    Phone,
    About,
    Photo,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegData {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Канонический вид ГГГГ-ММ-ДД
    pub birth_date: Option<chrono::NaiveDate>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub about: Option<String>,
    pub photo: Option<String>,
}

// ---------------------------------------------------------------------------
// Добавление автомобиля

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddCarStep {
    Brand,
    Model,
    Year,
    Color,
    Plate,
    Photos,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddCarData {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub plate: Option<String>,
    pub photos: Vec<String>,
}

// ---------------------------------------------------------------------------
// Приглашение

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteStep {
    Plate,
    ConfirmDuplicate,
    Photos,
    Comment,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InviteData {
    pub plate: Option<String>,
    pub photos: Vec<String>,
    pub comment: Option<String>,
    /// Пользователь явно подтвердил повторное приглашение по этому номеру
    pub duplicate_confirmed: bool,
    /// Разрешена ли рассылка в клубный чат из контекста запуска
    pub broadcast: bool,
}

// ---------------------------------------------------------------------------
// Правка полей профиля и машины

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    FirstName,
    LastName,
    BirthDate,
    City,
    Country,
    Phone,
    About,
    Photo,
}

impl ProfileField {
    pub fn code(&self) -> &'static str {
        match self {
            ProfileField::FirstName => "first_name",
            ProfileField::LastName => "last_name",
            ProfileField::BirthDate => "birth_date",
            ProfileField::City => "city",
            ProfileField::Country => "country",
            ProfileField::Phone => "phone",
            ProfileField::About => "about",
            ProfileField::Photo => "photo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "first_name" => Some(ProfileField::FirstName),
            "last_name" => Some(ProfileField::LastName),
            "birth_date" => Some(ProfileField::BirthDate),
            "city" => Some(ProfileField::City),
            "country" => Some(ProfileField::Country),
            "phone" => Some(ProfileField::Phone),
            "about" => Some(ProfileField::About),
            "photo" => Some(ProfileField::Photo),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ProfileField::FirstName => "Имя",
            ProfileField::LastName => "Фамилия",
            ProfileField::BirthDate => "Дата рождения",
            ProfileField::City => "Город",
            ProfileField::Country => "Страна",
            ProfileField::Phone => "Телефон",
            ProfileField::About => "О себе",
            ProfileField::Photo => "Фото",
        }
    }

    pub fn all() -> [ProfileField; 8] {
        [
            ProfileField::FirstName,
            ProfileField::LastName,
            ProfileField::BirthDate,
            ProfileField::City,
            ProfileField::Country,
            ProfileField::Phone,
            ProfileField::About,
            ProfileField::Photo,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarField {
    Brand,
    Model,
    Year,
    Color,
    Plate,
    Photos,
}

impl CarField {
    pub fn code(&self) -> &'static str {
        match self {
            CarField::Brand => "brand",
            CarField::Model => "model",
            CarField::Year => "year",
            CarField::Color => "color",
            CarField::Plate => "plate",
            CarField::Photos => "photos",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "brand" => Some(CarField::Brand),
            "model" => Some(CarField::Model),
            "year" => Some(CarField::Year),
            "color" => Some(CarField::Color),
            "plate" => Some(CarField::Plate),
            "photos" => Some(CarField::Photos),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CarField::Brand => "Марка",
            CarField::Model => "Модель",
            CarField::Year => "Год выпуска",
            CarField::Color => "Цвет",
            CarField::Plate => "Госномер",
            CarField::Photos => "Фотографии",
        }
    }

    pub fn all() -> [CarField; 6] {
        [
            CarField::Brand,
            CarField::Model,
            CarField::Year,
            CarField::Color,
            CarField::Plate,
            CarField::Photos,
        ]
    }
}

// ---------------------------------------------------------------------------
// Админская смена статуса

#[derive(Debug, Clone, PartialEq)]
pub enum SetStatusStep {
    PickMember,
    PickStatus { tg_id: i64 },
}
