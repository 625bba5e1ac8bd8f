//! Cover letter templates.

use std::fmt;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::opportunity::Opportunity;
use crate::settings::LetterConfig;

/// The available letter layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CoverLetterTemplate {
    /// Addressed to a search committee, asking about the position
    Inquiry,
    /// Addressed to a professor, applying directly
    Application,
}

impl CoverLetterTemplate {
    pub const ALL: [CoverLetterTemplate; 2] =
        [CoverLetterTemplate::Inquiry, CoverLetterTemplate::Application];

    /// Fill the template for a position title.
    pub fn render(self, title: &str, fields: &LetterConfig) -> String {
        match self {
            CoverLetterTemplate::Inquiry => format!(
                "Subject: Inquiry About PhD Opportunity - {field_interest}

Dear Search Committee,

I am writing to express my interest in the {title} position. With my background in {field_interest} and experience in {technical_domain}, I believe I would be a strong candidate for this research opportunity.

My qualifications include:
- Advanced degree in a relevant field
- Experience with {technical_skills}
- Research interests aligned with {research_area}
- Strong analytical and programming skills

I am particularly interested in opportunities that involve {specific_interests} and believe my background would allow me to contribute meaningfully to your research program.

Thank you for your consideration.

Sincerely,
[Your Name]
[Your Contact Information]
",
                title = title,
                field_interest = fields.field_interest,
                technical_domain = fields.technical_domain,
                technical_skills = fields.technical_skills,
                research_area = fields.research_area,
                specific_interests = fields.specific_interests,
            ),
            CoverLetterTemplate::Application => format!(
                "Subject: PhD Application - {title}

Dear Professor,

I am excited to apply for the {title} position. My research background in {field_interest} and technical skills in {technical_domain} align well with the requirements of this role.

During my academic and professional career, I have developed:
- Expertise in {key_skills}
- Experience with research methodologies in {research_area}
- Strong problem-solving abilities in technical domains

I am eager to contribute to research in {specific_interests} and believe my background in {matching_skills} would be valuable to your team.

Thank you for considering my application.

Best regards,
[Your Name]
",
                title = title,
                field_interest = fields.field_interest,
                technical_domain = fields.technical_domain,
                key_skills = fields.key_skills,
                research_area = fields.research_area,
                specific_interests = fields.specific_interests,
                matching_skills = fields.matching_skills,
            ),
        }
    }
}

impl fmt::Display for CoverLetterTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverLetterTemplate::Inquiry => write!(f, "inquiry"),
            CoverLetterTemplate::Application => write!(f, "application"),
        }
    }
}

/// Picks a template at random and fills it.
#[derive(Debug)]
pub struct CoverLetterGenerator {
    fields: LetterConfig,
    rng: StdRng,
}

impl CoverLetterGenerator {
    pub fn new(fields: LetterConfig) -> Self {
        Self {
            fields,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic template choice, for reproducible runs.
    pub fn with_seed(fields: LetterConfig, seed: u64) -> Self {
        Self {
            fields,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn choose_template(&mut self) -> CoverLetterTemplate {
        let index = self.rng.random_range(0..CoverLetterTemplate::ALL.len());
        CoverLetterTemplate::ALL[index]
    }

    /// Letter for an opportunity using a randomly chosen template.
    pub fn generate(&mut self, opportunity: &Opportunity) -> String {
        let template = self.choose_template();
        tracing::debug!("Using {} template for {}", template, opportunity.id);
        template.render(&opportunity.title, &self.fields)
    }

    /// Letter for a title with an explicit template.
    pub fn generate_with(&self, template: CoverLetterTemplate, title: &str) -> String {
        template.render(title, &self.fields)
    }
}
