/// A titled group of example questions shown to new users.
pub struct QuestionCategory {
    pub title: &'static str,
    pub questions: &'static [&'static str],
}

pub const EXAMPLE_CATEGORIES: &[QuestionCategory] = &[
    QuestionCategory {
        title: "Price-related Questions",
        questions: &[
            "What are the cheapest products?",
            "Show me all products under $500",
            "What's the most expensive notebook available?",
            "Show me products between $1000 and $2000",
        ],
    },
    QuestionCategory {
        title: "Category-based Questions",
        questions: &[
            "What gaming mice do you have?",
            "Show me all available notebooks",
            "What wireless keyboards are in stock?",
            "List all products in the mouse category",
        ],
    },
    QuestionCategory {
        title: "Stock-related Questions",
        questions: &[
            "Which products are currently in stock?",
            "Do you have any gaming keyboards available?",
            "Show me notebooks that are in stock",
        ],
    },
    QuestionCategory {
        title: "Product Search Questions",
        questions: &[
            "Do you have any Logitech products?",
            "Show me all RGB keyboards",
            "Are there any mechanical keyboards?",
        ],
    },
    QuestionCategory {
        title: "Combined Criteria Questions",
        questions: &[
            "What are the cheapest gaming mice in stock?",
            "Show me wireless keyboards under $100",
            "What are the most expensive gaming products?",
            "Do you have any budget notebooks in stock?",
        ],
    },
];

/// Every example question in display order, paired with its 1-based number.
pub fn numbered() -> impl Iterator<Item = (usize, &'static str)> {
    EXAMPLE_CATEGORIES
        .iter()
        .flat_map(|c| c.questions.iter().copied())
        .enumerate()
        .map(|(i, q)| (i + 1, q))
}

/// Look up an example by the number shown next to it.
pub fn by_number(n: usize) -> Option<&'static str> {
    numbered().find(|(i, _)| *i == n).map(|(_, q)| q)
}

pub fn count() -> usize {
    EXAMPLE_CATEGORIES.iter().map(|c| c.questions.len()).sum()
}
