//! Seed data: the default learning roadmap and the static quiz fallback sets
//! served when generated content cannot be validated.

use crate::domain::{AnswerKey, QuizQuestion};
use crate::util::fill_template;

/// Default Java DSA roadmap, in teaching order.
pub const DEFAULT_ROADMAP: [&str; 16] = [
  "Java Arrays and ArrayLists",
  "Strings and String Methods in Java",
  "Java Collections - Lists",
  "Java Collections - Sets and Maps",
  "Stacks and Queues in Java",
  "Linked Lists Implementation",
  "Sorting Algorithms in Java",
  "Searching Algorithms",
  "Binary Search Trees in Java",
  "Recursion Fundamentals",
  "Graphs and Graph Traversal",
  "Dynamic Programming in Java",
  "Hash Tables and HashMap",
  "Heaps and Priority Queues",
  "Greedy Algorithms",
  "Backtracking Techniques",
];

pub fn default_roadmap() -> Vec<String> {
  DEFAULT_ROADMAP.iter().map(|t| t.to_string()).collect()
}

/// Row of a static question table. `{topic}` placeholders are filled at render time.
pub struct FallbackQuestion {
  pub question: &'static str,
  pub options: [&'static str; 4],
  pub correct: AnswerKey,
  pub explanation: &'static str,
}

/// Served when the model output has no usable questions. Parameterized by topic only.
pub const TOPIC_FALLBACK: [FallbackQuestion; 10] = [
  FallbackQuestion {
    question: "What is a key feature of {topic}?",
    options: ["Efficient performance", "Easy to understand", "Widely used", "All of the above"],
    correct: AnswerKey::D,
    explanation: "All of these are important characteristics of {topic}. It provides efficient performance, is relatively straightforward to understand, and is widely used in real-world applications.",
  },
  FallbackQuestion {
    question: "How would you implement {topic} in Java?",
    options: ["Using arrays", "Using linked lists", "Using hash tables", "Depends on the use case"],
    correct: AnswerKey::D,
    explanation: "The implementation of {topic} depends on your specific use case. Different data structures offer different trade-offs in terms of performance and memory usage.",
  },
  FallbackQuestion {
    question: "What is the time complexity of {topic} operations?",
    options: ["O(1)", "O(n)", "O(log n)", "Depends on implementation"],
    correct: AnswerKey::D,
    explanation: "The time complexity of {topic} operations varies depending on the specific implementation and which operation you're referring to.",
  },
  FallbackQuestion {
    question: "When should you use {topic}?",
    options: ["Always", "For small datasets", "When you need fast lookups", "Never"],
    correct: AnswerKey::C,
    explanation: "{topic} is most beneficial when you need fast lookups or specific performance characteristics. It's not always the best choice for every scenario.",
  },
  FallbackQuestion {
    question: "What is a limitation of {topic}?",
    options: ["It's too fast", "Memory overhead", "Difficult to implement", "Cannot store data"],
    correct: AnswerKey::B,
    explanation: "Like most data structures, {topic} has memory overhead. The trade-off between time efficiency and space complexity is a key consideration.",
  },
  FallbackQuestion {
    question: "How does Java handle {topic}?",
    options: ["Built-in classes", "Custom implementation only", "Through collections framework", "Both A and C"],
    correct: AnswerKey::D,
    explanation: "Java provides built-in classes for many common implementations of {topic}, and you can also create custom implementations when needed.",
  },
  FallbackQuestion {
    question: "What is the best practice for {topic}?",
    options: ["Always use it", "Never use it", "Choose based on requirements", "Use randomly"],
    correct: AnswerKey::C,
    explanation: "The best practice is to analyze your specific requirements and choose {topic} only when it provides the best performance and fit for your use case.",
  },
  FallbackQuestion {
    question: "Can {topic} handle concurrent operations?",
    options: ["Yes, always", "No, never", "Depends on implementation", "Only in Java 8+"],
    correct: AnswerKey::C,
    explanation: "Whether {topic} can handle concurrent operations depends on the specific implementation. Some implementations are thread-safe while others are not.",
  },
  FallbackQuestion {
    question: "What interview question about {topic} is most common?",
    options: ["How to implement it", "When to use it", "Time complexity", "All of the above"],
    correct: AnswerKey::D,
    explanation: "Interviewers commonly ask about implementation, use cases, and performance characteristics of {topic}. Being prepared for all three is important.",
  },
  FallbackQuestion {
    question: "How do you optimize {topic} in Java?",
    options: ["Use larger data structures", "Reduce memory usage", "Optimize access patterns", "Add more methods"],
    correct: AnswerKey::C,
    explanation: "Optimizing {topic} typically involves analyzing and optimizing access patterns and choosing appropriate data structures based on your specific use case.",
  },
];

/// Last resort when the pipeline itself breaks. Not topic-specific.
pub const GENERIC_FALLBACK: [FallbackQuestion; 5] = [
  FallbackQuestion {
    question: "What did you learn today?",
    options: ["Data structures", "Algorithms", "Java programming", "DSA fundamentals"],
    correct: AnswerKey::D,
    explanation: "Great job on completing the lesson! Keep practicing to master these concepts.",
  },
  FallbackQuestion {
    question: "How will you apply this knowledge?",
    options: ["In coding interviews", "In real projects", "For competitive programming", "All of the above"],
    correct: AnswerKey::D,
    explanation: "These concepts are useful in many areas of software development. Practice and application are key!",
  },
  FallbackQuestion {
    question: "What's the next step?",
    options: ["Learn more topics", "Practice problems", "Review concepts", "All of the above"],
    correct: AnswerKey::D,
    explanation: "Continuous learning and practice will help you master DSA. Keep working through lessons and problems!",
  },
  FallbackQuestion {
    question: "How confident are you?",
    options: ["Very confident", "Somewhat confident", "Need more practice", "Will learn more"],
    correct: AnswerKey::C,
    explanation: "It's normal to need more practice. Keep going through the lessons and you'll get better!",
  },
  FallbackQuestion {
    question: "What's your learning goal?",
    options: ["Understand concepts", "Pass interviews", "Improve coding skills", "All of the above"],
    correct: AnswerKey::D,
    explanation: "Set clear goals for your learning journey. You're on the right track with Java DSA Mentor!",
  },
];

/// Render a static table into owned questions, filling `{topic}`.
pub fn render_fallback(table: &[FallbackQuestion], topic: &str) -> Vec<QuizQuestion> {
  let fill = |s: &str| fill_template(s, &[("topic", topic)]);
  table
    .iter()
    .map(|q| QuizQuestion {
      question: fill(q.question),
      options: q.options.map(fill),
      correct: q.correct,
      explanation: fill(q.explanation),
    })
    .collect()
}

/// The 10-question set for `topic`.
pub fn topic_fallback_quiz(topic: &str) -> Vec<QuizQuestion> {
  render_fallback(&TOPIC_FALLBACK, topic)
}

/// The fixed 5-question set.
pub fn generic_fallback_quiz() -> Vec<QuizQuestion> {
  render_fallback(&GENERIC_FALLBACK, "")
}
