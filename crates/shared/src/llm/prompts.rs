use crate::models::{AssessmentAnswers, BusinessStage};

/// Separates the assistant's prose from the trailing JSON list of next steps.
/// The system prompt asks the model to emit it and `progress` parses it.
pub const PROGRESS_ITEMS_MARKER: &str = "PROGRESS_ITEMS:";

const NOT_SPECIFIED: &str = "Not specified";

fn stage_description(stage: BusinessStage) -> &'static str {
    match stage {
        BusinessStage::Idea => "exploring a business idea and considering starting a business",
        BusinessStage::Startup => "actively launching their business",
        BusinessStage::Established => "running an established business",
        BusinessStage::Growth => "looking to scale and grow their business",
        BusinessStage::Transition => {
            "making major changes, planning succession, or pivoting their business"
        }
    }
}

fn stage_greeting(stage: Option<BusinessStage>) -> &'static str {
    match stage {
        Some(BusinessStage::Idea) => "exploring your business idea",
        Some(BusinessStage::Startup) => "launching your new business",
        Some(BusinessStage::Established) => "running your established business",
        Some(BusinessStage::Growth) => "growing and scaling your business",
        Some(BusinessStage::Transition) => "navigating this business transition",
        None => "your business journey",
    }
}

pub fn build_system_prompt(answers: &AssessmentAnswers) -> String {
    let stage = answers
        .stage
        .map(stage_description)
        .unwrap_or("at an unknown stage");
    let industry = non_empty(answers.industry.as_deref()).unwrap_or(NOT_SPECIFIED);
    let challenge = non_empty(answers.main_challenge.as_deref()).unwrap_or(NOT_SPECIFIED);
    let business_plan = match answers.has_business_plan {
        Some(true) => "Yes",
        Some(false) => "No",
        None => NOT_SPECIFIED,
    };

    format!(
        "You are a helpful AI assistant specifically designed to help Louisiana small business owners. \
Your role is to provide practical, actionable guidance tailored to their specific situation.

Context about this business owner:
- Business stage: They are {stage}
- Industry: {industry}
- Main challenge: {challenge}
- Has a business plan: {business_plan}

Guidelines for your responses:
1. Be encouraging and supportive - many users are new to entrepreneurship
2. Provide specific, actionable advice rather than generic information
3. When relevant, mention Louisiana-specific resources, programs, or considerations
4. Keep responses clear and well-organized (use bullet points, numbered lists, etc.)
5. If asked about regulations or legal matters, emphasize the importance of consulting with professionals
6. Tailor your advice to their business stage and challenges
7. Be conversational and approachable - many users are not tech-savvy
8. When appropriate, ask clarifying questions to provide better guidance
9. For Louisiana-specific information, reference state agencies like Louisiana Economic Development, \
Louisiana Small Business Development Center (LSBDC), Louisiana Secretary of State, etc.
10. If you don't know something specific to Louisiana, be honest and suggest where they can find that information

At the very end of every response, on its own line, write {PROGRESS_ITEMS_MARKER} followed by a JSON array \
of 3 to 5 suggested next actions. Each element must be an object with the string fields \"title\", \
\"description\" and \"category\". Write nothing after the array.
Example: {PROGRESS_ITEMS_MARKER}[{{\"title\":\"Register your business\",\"description\":\"File with the \
Louisiana Secretary of State through geauxBIZ\",\"category\":\"Compliance\"}}]

Remember: Your goal is to empower Louisiana small business owners with knowledge and confidence to succeed."
    )
}

pub fn welcome_message(answers: &AssessmentAnswers) -> String {
    let focus = match (
        non_empty(answers.main_challenge.as_deref()),
        non_empty(answers.industry.as_deref()),
    ) {
        (Some(challenge), Some(industry)) => format!(
            "I understand your main focus is on **{challenge}** in the **{industry}** industry.\n\n"
        ),
        (Some(challenge), None) => {
            format!("I understand your main focus is on **{challenge}**.\n\n")
        }
        (None, Some(industry)) => format!("I understand you work in the **{industry}** industry.\n\n"),
        (None, None) => String::new(),
    };

    format!(
        "Welcome! I'm here to help you with {stage}.

{focus}I can help you with:
• Business planning and strategy
• Louisiana-specific regulations and resources
• Marketing and customer acquisition
• Financial planning and funding options
• Operations and management
• And much more!

**To get started**, simply type any question you have about your business.

How can I help you today?",
        stage = stage_greeting(answers.stage),
    )
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
