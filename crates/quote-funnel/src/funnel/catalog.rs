use serde::{Deserialize, Serialize};

/// Value of the free-text "other" sentinel option.
pub const OTHER_VALUE: &str = "other";
/// Value of the mutually exclusive "none" option in multi-choice steps.
pub const NONE_VALUE: &str = "none";

/// Identifies a funnel step and the answer field it writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKey {
    BusinessType,
    WebsiteType,
    Pages,
    Features,
    Branding,
    Timeline,
    Contact,
}

impl StepKey {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::BusinessType,
            Self::WebsiteType,
            Self::Pages,
            Self::Features,
            Self::Branding,
            Self::Timeline,
            Self::Contact,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BusinessType => "businessType",
            Self::WebsiteType => "websiteType",
            Self::Pages => "pages",
            Self::Features => "features",
            Self::Branding => "branding",
            Self::Timeline => "timeline",
            Self::Contact => "contact",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ordered().into_iter().find(|key| key.as_str() == raw)
    }

    /// Name of the free-text companion field filled when `other` is chosen.
    pub const fn other_text_field(self) -> Option<&'static str> {
        match self {
            Self::BusinessType => Some("businessTypeOther"),
            Self::Pages => Some("pagesOther"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Single,
    Multi,
    Contact,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionChoice {
    pub value: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepDefinition {
    pub key: StepKey,
    pub kind: StepKind,
    pub question: &'static str,
    pub options: Vec<OptionChoice>,
}

impl StepDefinition {
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }

    pub fn label_for(&self, value: &str) -> Option<&'static str> {
        self.options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.label)
    }

    pub fn allows_other(&self) -> bool {
        self.key.other_text_field().is_some() && self.has_option(OTHER_VALUE)
    }

    pub fn has_exclusive_none(&self) -> bool {
        self.kind == StepKind::Multi && self.has_option(NONE_VALUE)
    }
}

/// Ordered, immutable list of funnel steps.
#[derive(Debug, Clone)]
pub struct Catalog {
    steps: Vec<StepDefinition>,
}

impl Catalog {
    pub fn standard() -> Self {
        Self {
            steps: standard_steps(),
        }
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_at(&self, index: usize) -> Option<&StepDefinition> {
        self.steps.get(index)
    }

    pub fn step(&self, key: StepKey) -> Option<&StepDefinition> {
        self.steps.iter().find(|step| step.key == key)
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }
}

fn choice(value: &'static str, label: &'static str) -> OptionChoice {
    OptionChoice { value, label }
}

fn standard_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition {
            key: StepKey::BusinessType,
            kind: StepKind::Single,
            question: "What kind of business is the website for?",
            options: vec![
                choice("restaurant", "Restaurant / Cafe"),
                choice("retail", "Retail shop"),
                choice("beauty", "Beauty salon / Spa"),
                choice("medical", "Clinic / Medical practice"),
                choice("realestate", "Real estate"),
                choice("education", "Education / Courses"),
                choice("tourism", "Tourism / Hotel"),
                choice("services", "Professional services"),
                choice(OTHER_VALUE, "Other"),
            ],
        },
        StepDefinition {
            key: StepKey::WebsiteType,
            kind: StepKind::Single,
            question: "Which type of website do you need?",
            options: vec![
                choice("landing", "Landing page"),
                choice("informational", "Business card website"),
                choice("corporate", "Corporate website"),
                choice("ecommerce", "Online store"),
            ],
        },
        StepDefinition {
            key: StepKey::Pages,
            kind: StepKind::Multi,
            question: "Which pages should the website include?",
            options: vec![
                choice("home", "Home"),
                choice("about", "About us"),
                choice("services", "Services"),
                choice("gallery", "Gallery / Portfolio"),
                choice("blog", "Blog / News"),
                choice("contact", "Contact"),
                choice("faq", "FAQ"),
                choice("pricing", "Pricing"),
                choice("team", "Team"),
                choice(OTHER_VALUE, "Other"),
            ],
        },
        StepDefinition {
            key: StepKey::Features,
            kind: StepKind::Multi,
            question: "Which features do you need?",
            options: vec![
                choice("contact_form", "Contact form"),
                choice("booking", "Online booking"),
                choice("online_payment", "Online payments"),
                choice("multilingual", "Multiple languages"),
                choice("blog_cms", "Content management"),
                choice("live_chat", "Live chat"),
                choice("google_maps", "Google Maps"),
                choice("social_integration", "Social media integration"),
                choice("seo", "SEO optimisation"),
                choice("analytics", "Analytics setup"),
                choice(NONE_VALUE, "None of these"),
            ],
        },
        StepDefinition {
            key: StepKey::Branding,
            kind: StepKind::Multi,
            question: "Do you need help with branding or content?",
            options: vec![
                choice("logo", "Logo design"),
                choice("brand_identity", "Brand identity"),
                choice("copywriting", "Copywriting"),
                choice("photography", "Photography"),
                choice(NONE_VALUE, "No, I have everything"),
            ],
        },
        StepDefinition {
            key: StepKey::Timeline,
            kind: StepKind::Single,
            question: "When do you need the website?",
            options: vec![
                choice("urgent", "As soon as possible"),
                choice("standard", "Within 1-2 months"),
                choice("flexible", "No fixed deadline"),
                choice("exploring", "Just exploring prices"),
            ],
        },
        StepDefinition {
            key: StepKey::Contact,
            kind: StepKind::Contact,
            question: "How can we reach you?",
            options: vec![
                choice("phone", "Phone call"),
                choice("whatsapp", "WhatsApp"),
                choice("viber", "Viber"),
                choice("telegram", "Telegram"),
                choice("email", "Email"),
            ],
        },
    ]
}
