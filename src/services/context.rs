//! Builds the context window sent to the language model.

use crate::models::{Message, Role};

/// Default ceiling for [`trim_to_budget`].
pub const DEFAULT_TOKEN_BUDGET: usize = 2000;

/// Rough token estimate: one token per four characters, rounded up.
/// Does not match any real tokenizer.
pub fn estimate_tokens(message: &Message) -> usize {
    message.content.chars().count().div_ceil(4)
}

/// Keeps the newest messages whose estimated cost fits `budget`.
///
/// The result is a contiguous suffix of `messages` in chronological order.
/// The newest message is always kept, even when it alone exceeds the budget.
pub fn trim_to_budget(messages: &[Message], budget: usize) -> Vec<Message> {
    let mut total = 0;
    let mut start = messages.len();

    for (index, message) in messages.iter().enumerate().rev() {
        let cost = estimate_tokens(message);
        if start < messages.len() && total + cost > budget {
            break;
        }
        total += cost;
        start = index;
    }

    messages[start..].to_vec()
}

/// Memory turns (oldest-first) followed by the submitted turns, trimmed.
/// Memory turns the client already sent back are skipped.
pub fn assemble(memory: &[Message], incoming: &[Message], budget: usize) -> Vec<Message> {
    let combined: Vec<Message> = memory
        .iter()
        .filter(|remembered| !incoming.contains(remembered))
        .chain(incoming.iter())
        .cloned()
        .collect();
    trim_to_budget(&combined, budget)
}

/// Turns the client added since the last assistant reply.
pub fn new_turns(incoming: &[Message]) -> &[Message] {
    let start = incoming
        .iter()
        .rposition(|m| m.role == Role::Assistant)
        .map_or(0, |index| index + 1);
    &incoming[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(len: usize) -> Message {
        Message::user("x".repeat(len))
    }

    fn total_cost(messages: &[Message]) -> usize {
        messages.iter().map(estimate_tokens).sum()
    }

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(&msg(0)), 0);
        assert_eq!(estimate_tokens(&msg(1)), 1);
        assert_eq!(estimate_tokens(&msg(4)), 1);
        assert_eq!(estimate_tokens(&msg(5)), 2);
        // counts characters, not bytes
        assert_eq!(estimate_tokens(&Message::user("éééé")), 1);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(trim_to_budget(&[], 10).is_empty());
    }

    #[test]
    fn everything_fits() {
        let messages = vec![msg(8), msg(8), msg(8)];
        assert_eq!(trim_to_budget(&messages, 6), messages);
    }

    #[test]
    fn drops_oldest_first() {
        let messages = vec![
            Message::user("a".repeat(40)),
            Message::assistant("b".repeat(40)),
            Message::user("c".repeat(40)),
        ];
        let trimmed = trim_to_budget(&messages, 20);
        assert_eq!(trimmed, messages[1..].to_vec());
        assert!(total_cost(&trimmed) <= 20);
    }

    #[test]
    fn stops_at_first_message_that_overflows() {
        // the oldest message would fit on its own but is behind a large one
        let messages = vec![msg(4), msg(400), msg(4)];
        let trimmed = trim_to_budget(&messages, 10);
        assert_eq!(trimmed, vec![msg(4)]);
    }

    #[test]
    fn oversized_newest_message_is_kept() {
        let messages = vec![msg(4), msg(10_000)];
        let trimmed = trim_to_budget(&messages, 10);
        assert_eq!(trimmed, vec![msg(10_000)]);
    }

    #[test]
    fn output_is_suffix_within_budget() {
        let lengths = [3, 17, 250, 9, 64, 1, 120, 33, 7, 500, 12, 80];
        let messages: Vec<Message> = lengths.iter().map(|&len| msg(len)).collect();

        for budget in [0, 1, 5, 20, 50, 100, 300, 1000] {
            let trimmed = trim_to_budget(&messages, budget);
            assert!(!trimmed.is_empty());
            assert_eq!(trimmed[..], messages[messages.len() - trimmed.len()..]);
            if trimmed.len() > 1 {
                assert!(total_cost(&trimmed) <= budget, "budget {budget}");
            }
        }
    }

    #[test]
    fn trimming_is_idempotent() {
        let lengths = [90, 3, 41, 200, 8, 8, 16, 1200, 5];
        let messages: Vec<Message> = lengths.iter().map(|&len| msg(len)).collect();

        for budget in [1, 10, 50, 400, 2000] {
            let once = trim_to_budget(&messages, budget);
            let twice = trim_to_budget(&once, budget);
            assert_eq!(once, twice, "budget {budget}");
        }
    }

    #[test]
    fn assemble_puts_memory_before_new_turns() {
        let memory = vec![Message::user("earlier"), Message::assistant("answer")];
        let incoming = vec![Message::user("now")];
        let context = assemble(&memory, &incoming, DEFAULT_TOKEN_BUDGET);

        let roles: Vec<Role> = context.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(context.last().map(|m| m.content.as_str()), Some("now"));
    }

    #[test]
    fn assemble_skips_memory_the_client_resent() {
        let memory = vec![Message::assistant("r1")];
        let incoming = vec![
            Message::user("q1"),
            Message::assistant("r1"),
            Message::user("q2"),
        ];
        assert_eq!(assemble(&memory, &incoming, DEFAULT_TOKEN_BUDGET), incoming);
    }

    #[test]
    fn new_turns_follow_the_last_reply() {
        let session = vec![
            Message::user("q1"),
            Message::assistant("r1"),
            Message::user("q2"),
        ];
        assert_eq!(new_turns(&session), &session[2..]);
        assert_eq!(new_turns(&session[..1]), &session[..1]);
        assert!(new_turns(&session[..2]).is_empty());
    }
}
