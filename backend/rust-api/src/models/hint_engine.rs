//! Lifeline generators. Pure functions over a question's visible options;
//! recording and the once-per-game rule live in `GameQuestion` and `Game`.

use rand::{seq::IndexedRandom, Rng};
use std::collections::BTreeMap;

use super::game_question::Letter;

/// Probability that the friend on the phone names the correct option.
pub const FRIEND_CALL_ACCURACY: f64 = 0.8;

/// Fixed part of every friend-call message.
pub const FRIEND_CALL_PHRASE: &str = "thinks the answer is option";

/// Vote share range (percent) the audience gives the correct option.
const AUDIENCE_CORRECT_SHARE: std::ops::RangeInclusive<u32> = 40..=85;

const FRIENDS: [&str; 8] = [
    "Vasily Petrovich",
    "Aunt Marina",
    "Professor Kovalev",
    "Your neighbour Oleg",
    "Grandma Zina",
    "Coach Sergey",
    "Cousin Lena",
    "Captain Ivanov",
];

fn incorrect_letters(variants: &BTreeMap<Letter, String>, correct: Letter) -> Vec<Letter> {
    variants
        .keys()
        .copied()
        .filter(|&letter| letter != correct)
        .collect()
}

/// Leaves the correct option plus one random wrong one, in letter order.
pub fn fifty_fifty<R: Rng + ?Sized>(
    variants: &BTreeMap<Letter, String>,
    correct: Letter,
    rng: &mut R,
) -> Vec<Letter> {
    let mut remaining = vec![correct];
    if let Some(&decoy) = incorrect_letters(variants, correct).choose(rng) {
        remaining.push(decoy);
    }
    remaining.sort_unstable();
    remaining
}

/// Percent of the audience voting for each option.
///
/// The correct option gets a share from `AUDIENCE_CORRECT_SHARE`; the rest
/// is cut at two random points and spread over the wrong options. Shares
/// always sum to 100.
pub fn audience_help<R: Rng + ?Sized>(
    variants: &BTreeMap<Letter, String>,
    correct: Letter,
    rng: &mut R,
) -> BTreeMap<Letter, u32> {
    let wrong = incorrect_letters(variants, correct);

    let correct_share = rng.random_range(AUDIENCE_CORRECT_SHARE);
    let rest = 100 - correct_share;

    let mut cuts = [rng.random_range(0..=rest), rng.random_range(0..=rest)];
    cuts.sort_unstable();
    let wrong_shares = [cuts[0], cuts[1] - cuts[0], rest - cuts[1]];

    let mut votes = BTreeMap::new();
    votes.insert(correct, correct_share);

    for (i, letter) in wrong.iter().enumerate() {
        votes.insert(*letter, wrong_shares.get(i).copied().unwrap_or(0));
    }

    // Fewer than three wrong options: fold the unassigned share into the correct one.
    let assigned: u32 = votes.values().sum();
    if assigned < 100 {
        *votes.entry(correct).or_insert(0) += 100 - assigned;
    }

    votes
}

/// What a random friend says on the phone. Right with probability
/// `FRIEND_CALL_ACCURACY`, otherwise names a random wrong option.
pub fn friend_call<R: Rng + ?Sized>(
    variants: &BTreeMap<Letter, String>,
    correct: Letter,
    rng: &mut R,
) -> String {
    let named = if rng.random_bool(FRIEND_CALL_ACCURACY) {
        correct
    } else {
        incorrect_letters(variants, correct)
            .choose(rng)
            .copied()
            .unwrap_or(correct)
    };

    let friend = FRIENDS.choose(rng).copied().unwrap_or(FRIENDS[0]);

    format!("{} {} {}", friend, FRIEND_CALL_PHRASE, named.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn variants() -> BTreeMap<Letter, String> {
        Letter::ALL
            .iter()
            .map(|&letter| (letter, format!("answer {}", letter)))
            .collect()
    }

    #[test]
    fn fifty_fifty_always_keeps_two_options_including_correct() {
        let mut rng = StdRng::seed_from_u64(11);
        for correct in Letter::ALL {
            for _ in 0..50 {
                let left = fifty_fifty(&variants(), correct, &mut rng);
                assert_eq!(left.len(), 2);
                assert!(left.contains(&correct));
                assert_ne!(left[0], left[1]);
            }
        }
    }

    #[test]
    fn audience_votes_cover_all_letters_and_sum_to_hundred() {
        let mut rng = StdRng::seed_from_u64(12);
        for correct in Letter::ALL {
            for _ in 0..200 {
                let votes = audience_help(&variants(), correct, &mut rng);
                assert_eq!(votes.len(), 4);
                assert_eq!(votes.values().sum::<u32>(), 100);
                assert!(AUDIENCE_CORRECT_SHARE.contains(&votes[&correct]));
            }
        }
    }

    #[test]
    fn audience_favours_correct_answer() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut plurality = 0;
        for _ in 0..500 {
            let votes = audience_help(&variants(), Letter::C, &mut rng);
            let top = votes.values().copied().max().unwrap_or(0);
            if votes[&Letter::C] == top {
                plurality += 1;
            }
        }
        assert!(plurality > 400, "correct option won only {} of 500 polls", plurality);
    }

    #[test]
    fn friend_call_names_a_letter_with_fixed_phrase() {
        let mut rng = StdRng::seed_from_u64(14);
        let mut correct_calls = 0;
        for _ in 0..1000 {
            let message = friend_call(&variants(), Letter::A, &mut rng);
            assert!(message.contains(FRIEND_CALL_PHRASE));

            let named = message.chars().last().unwrap();
            assert!(['A', 'B', 'C', 'D'].contains(&named));
            if named == 'A' {
                correct_calls += 1;
            }
        }
        assert!(
            (700..=900).contains(&correct_calls),
            "friend was right {} times out of 1000",
            correct_calls
        );
    }
}
