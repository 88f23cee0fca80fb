use crate::models::{ActionItem, AssessmentAnswers, BusinessStage, CompletionResult};

pub const DEMO_MODE_NOTE: &str = "*Note: Configure ANTHROPIC_API_KEY on the relay server for full AI-powered responses.*";

struct CannedItem {
    title: &'static str,
    description: &'static str,
}

/// A topic matched when the lower-cased user text contains any keyword.
struct FallbackRule {
    topic: &'static str,
    category: &'static str,
    keywords: &'static [&'static str],
    message: &'static str,
    items: &'static [CannedItem],
}

impl FallbackRule {
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }

    fn respond(&self) -> CompletionResult {
        CompletionResult {
            message: format!("{}\n\n{DEMO_MODE_NOTE}", self.message),
            progress_items: canned_items(self.topic, Some(self.category), self.items),
        }
    }
}

// Evaluated in order; the first match wins.
const RULES: &[FallbackRule] = &[
    FallbackRule {
        topic: "business-plan",
        category: "Planning",
        keywords: &["business plan"],
        message: "Great question about business planning! Here's what I'd recommend:

**Key Components of a Business Plan:**

1. **Executive Summary** - A brief overview of your business concept and goals
2. **Market Analysis** - Research on your target customers and competition in Louisiana
3. **Products/Services** - Detailed description of what you're offering
4. **Marketing Strategy** - How you'll reach customers and stand out
5. **Financial Projections** - Startup costs, revenue forecasts, and break-even analysis
6. **Operations Plan** - Day-to-day business operations and logistics

**Louisiana Resources:**
- The Louisiana Small Business Development Center (LSBDC) offers free business plan assistance
- SCORE Louisiana provides free mentoring from experienced business professionals

Would you like me to dive deeper into any specific section of the business plan?",
        items: &[
            CannedItem {
                title: "Draft your executive summary",
                description: "Write a one-page overview of your concept, customers and goals",
            },
            CannedItem {
                title: "Research your Louisiana market",
                description: "Identify target customers and local competitors",
            },
            CannedItem {
                title: "Build financial projections",
                description: "Estimate startup costs, monthly revenue and your break-even point",
            },
            CannedItem {
                title: "Book a free LSBDC consultation",
                description: "Get your draft plan reviewed by the Louisiana Small Business Development Center",
            },
        ],
    },
    FallbackRule {
        topic: "funding",
        category: "Funding",
        keywords: &["funding", "loan", "money"],
        message: "Let me help you explore funding options for your Louisiana business:

**Louisiana-Specific Funding:**
- **Louisiana Economic Development** offers various loan and grant programs
- **Small Business Loan Programs** through Louisiana banks and credit unions
- **Community Development Financial Institutions (CDFI)** like Hope Credit Union

**Federal Programs:**
- **SBA 7(a) Loans** - General purpose small business loans
- **SBA Microloans** - Up to $50,000 for startups
- **SBA 504 Loans** - For real estate and equipment

**Alternative Funding:**
- Angel investors and local investment groups
- Crowdfunding platforms
- Business incubators and accelerators in Louisiana

The best option depends on your specific needs, business stage, and financial situation. Would you like more details on any of these?",
        items: &[
            CannedItem {
                title: "Calculate how much funding you need",
                description: "List startup and working capital costs for the first 12 months",
            },
            CannedItem {
                title: "Review Louisiana Economic Development programs",
                description: "Check state loan and grant programs you may qualify for",
            },
            CannedItem {
                title: "Compare SBA loan options",
                description: "Look at 7(a), Microloan and 504 programs with a local lender",
            },
            CannedItem {
                title: "Contact a Louisiana CDFI",
                description: "Ask a community lender such as Hope Credit Union about small business loans",
            },
        ],
    },
    FallbackRule {
        topic: "compliance",
        category: "Compliance",
        keywords: &["license", "permit", "register"],
        message: "Here's how licensing and registration usually work for a Louisiana business:

**State Registration:**
- Register your business entity with the **Louisiana Secretary of State** (geauxBIZ portal)
- Obtain a federal **Employer Identification Number (EIN)** from the IRS
- Register with the **Louisiana Department of Revenue** for state and sales taxes

**Local Requirements:**
- Apply for an occupational or business license with your parish or city
- Check zoning rules before signing a lease
- Ask about health, fire or building permits that apply to your industry

**Industry-Specific Licenses:**
- Food, alcohol, contracting, cosmetology and healthcare businesses need additional state licenses

Requirements vary by parish and industry, so confirm details with the agencies involved or a licensed professional. Which type of business are you registering?",
        items: &[
            CannedItem {
                title: "Register with the Secretary of State",
                description: "File your business entity through the geauxBIZ portal",
            },
            CannedItem {
                title: "Obtain your federal EIN",
                description: "Apply online with the IRS at no cost",
            },
            CannedItem {
                title: "Register for Louisiana sales tax",
                description: "Set up your account with the Louisiana Department of Revenue",
            },
            CannedItem {
                title: "Get your local business license",
                description: "Apply for an occupational license with your parish or city",
            },
        ],
    },
];

/// Canned answer used when no live provider is reachable. Total and
/// deterministic: identical inputs always produce identical output.
pub fn fallback_response(user_text: &str, answers: &AssessmentAnswers) -> CompletionResult {
    let lowered = user_text.to_lowercase();
    match RULES.iter().find(|rule| rule.matches(&lowered)) {
        Some(rule) => rule.respond(),
        None => stage_response(answers),
    }
}

fn stage_response(answers: &AssessmentAnswers) -> CompletionResult {
    let industry = non_empty(answers.industry.as_deref());
    let challenge = non_empty(answers.main_challenge.as_deref()).unwrap_or("your main concern");
    let stage_label = answers
        .stage
        .map(BusinessStage::as_str)
        .unwrap_or("your stage");
    let industry_line = match industry {
        Some(industry) => format!(" in the {industry} industry"),
        None => String::new(),
    };

    let (tips, items): (&str, &[CannedItem]) = match answers.stage {
        Some(BusinessStage::Idea) => (
            "- Validate your idea by talking to potential customers
- Research the Louisiana market for your business type
- Start with a simple business plan or lean canvas
- Connect with the Louisiana Small Business Development Center (LSBDC)",
            &[
                CannedItem {
                    title: "Interview potential customers",
                    description: "Talk to at least ten people who might buy from you",
                },
                CannedItem {
                    title: "Sketch a lean canvas",
                    description: "Capture your customers, problem, solution and costs on one page",
                },
                CannedItem {
                    title: "Contact the LSBDC",
                    description: "Schedule a free consultation with the Louisiana Small Business Development Center",
                },
            ],
        ),
        Some(BusinessStage::Startup) => (
            "- Register your business with the Louisiana Secretary of State
- Obtain necessary licenses and permits
- Set up a business bank account
- Create a basic accounting system
- Build your initial customer base",
            &[
                CannedItem {
                    title: "Register your business",
                    description: "File with the Louisiana Secretary of State",
                },
                CannedItem {
                    title: "Open a business bank account",
                    description: "Keep business and personal finances separate",
                },
                CannedItem {
                    title: "Set up bookkeeping",
                    description: "Choose an accounting system before your first sale",
                },
            ],
        ),
        Some(BusinessStage::Established) => (
            "- Focus on customer retention and satisfaction
- Look for opportunities to increase efficiency
- Consider diversifying your revenue streams
- Stay compliant with Louisiana regulations
- Invest in employee development",
            &[
                CannedItem {
                    title: "Survey your customers",
                    description: "Find out what keeps them coming back and what would not",
                },
                CannedItem {
                    title: "Review your operating costs",
                    description: "Identify the three largest expenses and ways to reduce them",
                },
                CannedItem {
                    title: "Check your compliance calendar",
                    description: "Confirm annual reports, renewals and tax filings are current",
                },
            ],
        ),
        Some(BusinessStage::Growth) => (
            "- Identify which products or customers drive most of your profit
- Plan hiring ahead of demand and document key processes
- Explore growth financing through Louisiana Economic Development and SBA programs
- Consider new markets within Louisiana and the Gulf South",
            &[
                CannedItem {
                    title: "Map your most profitable offerings",
                    description: "Rank products and customer segments by margin",
                },
                CannedItem {
                    title: "Write down your core processes",
                    description: "Document how key work gets done before you hire",
                },
                CannedItem {
                    title: "Explore growth financing",
                    description: "Review Louisiana Economic Development incentives and SBA options",
                },
            ],
        ),
        Some(BusinessStage::Transition) => (
            "- Get a professional valuation of your business
- Decide between selling, succession or a pivot
- Review contracts, leases and licenses that may need to transfer
- Talk to a Louisiana attorney and accountant early in the process",
            &[
                CannedItem {
                    title: "Get a business valuation",
                    description: "Understand what your business is worth today",
                },
                CannedItem {
                    title: "List transferable agreements",
                    description: "Collect leases, contracts and licenses affected by the change",
                },
                CannedItem {
                    title: "Meet with professional advisors",
                    description: "Consult a Louisiana attorney and accountant about your options",
                },
            ],
        ),
        None => (
            "- Take the short assessment so I can tailor my guidance
- Browse the Louisiana Small Business Development Center (LSBDC) resources
- Write down the one question that matters most to your business right now",
            &[CannedItem {
                title: "Complete your business assessment",
                description: "Tell me your stage, industry and main challenge",
            }],
        ),
    };

    let category = answers.stage.map(|_| "Stage");
    CompletionResult {
        message: format!(
            "Thank you for your question! I'm here to help Louisiana small business owners like you succeed.

Since this is running in demo mode, I'm providing general guidance.

**Here are some general tips for {stage_label}{industry_line}:**

{tips}

Is there a specific aspect of your business challenge ({challenge}) you'd like to discuss?

{DEMO_MODE_NOTE}"
        ),
        progress_items: canned_items(
            &format!("stage-{stage_label}").replace(' ', "-"),
            category,
            items,
        ),
    }
}

fn canned_items(topic: &str, category: Option<&str>, items: &[CannedItem]) -> Vec<ActionItem> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| ActionItem {
            id: format!("fallback-{topic}-{}", index + 1),
            title: item.title.to_string(),
            description: item.description.to_string(),
            completed: false,
            category: category.map(ToString::to_string),
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{DEMO_MODE_NOTE, fallback_response};
    use crate::models::{AssessmentAnswers, BusinessStage};

    fn startup_bakery() -> AssessmentAnswers {
        AssessmentAnswers {
            stage: Some(BusinessStage::Startup),
            industry: Some("Bakery".to_string()),
            main_challenge: Some("Finding customers".to_string()),
            has_business_plan: Some(false),
        }
    }

    #[test]
    fn funding_question_returns_funding_items() {
        let result = fallback_response("I need help with funding for my bakery", &startup_bakery());

        assert!(result.message.contains("Louisiana Economic Development"));
        assert!(!result.progress_items.is_empty());
        assert!(
            result
                .progress_items
                .iter()
                .all(|item| item.category.as_deref() == Some("Funding") && !item.completed)
        );
    }

    #[test]
    fn rules_are_evaluated_in_order() {
        // Mentions both a business plan and a loan; the business plan rule is first.
        let result = fallback_response(
            "Do I need a Business Plan before applying for a loan?",
            &AssessmentAnswers::default(),
        );
        assert!(result.message.starts_with("Great question about business planning"));
        assert_eq!(result.progress_items[0].category.as_deref(), Some("Planning"));
    }

    #[test]
    fn licensing_keywords_route_to_compliance() {
        let result = fallback_response("What PERMIT do I need?", &startup_bakery());
        assert!(result.message.contains("Louisiana Secretary of State"));
        assert_eq!(result.progress_items[0].id, "fallback-compliance-1");
    }

    #[test]
    fn unmatched_text_uses_stage_template() {
        let result = fallback_response("How do I hire my first employee?", &startup_bakery());

        assert!(result.message.contains("general tips for startup in the Bakery industry"));
        assert!(result.message.contains("(Finding customers)"));
        assert!(result.message.ends_with(DEMO_MODE_NOTE));
        assert_eq!(result.progress_items[0].id, "fallback-stage-startup-1");
    }

    #[test]
    fn unknown_stage_still_answers() {
        let result = fallback_response("hello", &AssessmentAnswers::default());
        assert!(result.message.contains("general tips for your stage:"));
        assert!(result.message.contains("(your main concern)"));
        assert_eq!(result.progress_items[0].id, "fallback-stage-your-stage-1");
        assert_eq!(result.progress_items[0].category, None);
    }

    #[test]
    fn identical_inputs_produce_identical_output() {
        let answers = startup_bakery();
        for text in [
            "business plan help",
            "Where can I get a LOAN",
            "register an LLC",
            "something unrelated",
        ] {
            let first = serde_json::to_string(&fallback_response(text, &answers))
                .expect("result should encode");
            let second = serde_json::to_string(&fallback_response(text, &answers))
                .expect("result should encode");
            assert_eq!(first, second);
        }
    }

    #[test]
    fn every_stage_has_a_template() {
        for stage in [
            BusinessStage::Idea,
            BusinessStage::Startup,
            BusinessStage::Established,
            BusinessStage::Growth,
            BusinessStage::Transition,
        ] {
            let answers = AssessmentAnswers {
                stage: Some(stage),
                ..AssessmentAnswers::default()
            };
            let result = fallback_response("tell me more", &answers);
            assert!(result.message.contains(stage.as_str()));
            assert!(!result.progress_items.is_empty());
        }
    }
}
