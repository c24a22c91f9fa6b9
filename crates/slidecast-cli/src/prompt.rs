//! Number prompts for moving more than one slide at a time.

use crossterm::event::{KeyCode, KeyEvent};

use crate::app::Action;

/// Digits accepted by the go-to prompt.
const GOTO_DIGITS: usize = 10;
/// Digits accepted by the jump prompt.
const JUMP_DIGITS: usize = 4;

/// An open prompt and what has been typed so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// `g` or `:` followed by a slide number and Enter.
    GoTo(String),
    /// A count typed in normal mode, then `h`/`←` or `l`/`→`.
    Jump(String),
}

/// Result of feeding one key to a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Pending,
    Cancelled,
    Done(Action),
}

impl Prompt {
    pub fn key(&mut self, key: KeyEvent) -> Outcome {
        if matches!(key.code, KeyCode::Esc) || crate::app::is_ctrl_c(key) {
            return Outcome::Cancelled;
        }
        match self {
            Prompt::GoTo(input) => match key.code {
                KeyCode::Char(c @ '0'..='9') => push_digit(input, c, GOTO_DIGITS),
                KeyCode::Backspace => {
                    input.pop();
                    Outcome::Pending
                }
                KeyCode::Enter => match input.parse::<usize>() {
                    Ok(n) if n > 0 => Outcome::Done(Action::GoTo(n - 1)),
                    _ => Outcome::Cancelled,
                },
                _ => Outcome::Pending,
            },
            Prompt::Jump(input) => match key.code {
                KeyCode::Char(c @ '0'..='9') => push_digit(input, c, JUMP_DIGITS),
                KeyCode::Backspace => {
                    input.pop();
                    Outcome::Pending
                }
                KeyCode::Left | KeyCode::Char('h') => jump(input, -1),
                KeyCode::Right | KeyCode::Char('l') => jump(input, 1),
                _ => Outcome::Pending,
            },
        }
    }

    /// Text for the status line.
    pub fn status(&self, slide_count: usize) -> String {
        match self {
            Prompt::GoTo(input) => {
                format!("Go to slide: {input}_  (1-{slide_count})  enter go  esc cancel")
            }
            Prompt::Jump(input) => {
                let shown = if input.is_empty() { "_" } else { input };
                format!("{shown}  ←/h previous  →/l next  esc cancel")
            }
        }
    }
}

fn push_digit(input: &mut String, c: char, limit: usize) -> Outcome {
    if input.len() < limit {
        input.push(c);
    }
    Outcome::Pending
}

fn jump(input: &str, sign: isize) -> Outcome {
    match input.parse::<isize>() {
        Ok(steps) if steps > 0 => Outcome::Done(Action::Jump(sign * steps)),
        _ => Outcome::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn feed(prompt: &mut Prompt, keys: &[KeyCode]) -> Outcome {
        let mut outcome = Outcome::Pending;
        for &code in keys {
            outcome = prompt.key(KeyEvent::new(code, KeyModifiers::NONE));
        }
        outcome
    }

    #[test]
    fn goto_takes_a_one_based_number() {
        let mut prompt = Prompt::GoTo(String::new());
        let keys = [KeyCode::Char('1'), KeyCode::Char('2'), KeyCode::Enter];
        assert_eq!(feed(&mut prompt, &keys), Outcome::Done(Action::GoTo(11)));
    }

    #[test]
    fn goto_backspace_edits_the_number() {
        let mut prompt = Prompt::GoTo(String::new());
        let keys = [
            KeyCode::Char('4'),
            KeyCode::Char('2'),
            KeyCode::Backspace,
            KeyCode::Enter,
        ];
        assert_eq!(feed(&mut prompt, &keys), Outcome::Done(Action::GoTo(3)));
    }

    #[rstest]
    #[case::empty(&[KeyCode::Enter])]
    #[case::zero(&[KeyCode::Char('0'), KeyCode::Enter])]
    #[case::escape(&[KeyCode::Char('3'), KeyCode::Esc])]
    fn goto_cancels(#[case] keys: &[KeyCode]) {
        let mut prompt = Prompt::GoTo(String::new());
        assert_eq!(feed(&mut prompt, keys), Outcome::Cancelled);
    }

    #[test]
    fn goto_ignores_letters() {
        let mut prompt = Prompt::GoTo(String::new());
        assert_eq!(feed(&mut prompt, &[KeyCode::Char('x')]), Outcome::Pending);
        assert_eq!(prompt, Prompt::GoTo(String::new()));
    }

    #[rstest]
    #[case(KeyCode::Char('l'), 13)]
    #[case(KeyCode::Right, 13)]
    #[case(KeyCode::Char('h'), -13)]
    #[case(KeyCode::Left, -13)]
    fn jump_direction(#[case] code: KeyCode, #[case] steps: isize) {
        let mut prompt = Prompt::Jump("1".to_string());
        let keys = [KeyCode::Char('3'), code];
        assert_eq!(feed(&mut prompt, &keys), Outcome::Done(Action::Jump(steps)));
    }

    #[test]
    fn jump_needs_a_count() {
        let mut prompt = Prompt::Jump(String::new());
        assert_eq!(feed(&mut prompt, &[KeyCode::Char('l')]), Outcome::Pending);
    }

    #[test]
    fn jump_count_is_capped() {
        let mut prompt = Prompt::Jump("1".to_string());
        feed(&mut prompt, &[KeyCode::Char('2'); 6]);
        assert_eq!(prompt, Prompt::Jump("1222".to_string()));
    }

    #[test]
    fn ctrl_c_cancels() {
        let mut prompt = Prompt::Jump("2".to_string());
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(prompt.key(ctrl_c), Outcome::Cancelled);
    }

    #[test]
    fn status_shows_the_input() {
        assert_eq!(
            Prompt::GoTo("7".into()).status(12),
            "Go to slide: 7_  (1-12)  enter go  esc cancel"
        );
        assert!(Prompt::Jump(String::new()).status(12).starts_with("_  "));
    }
}
