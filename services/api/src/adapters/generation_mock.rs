//! services/api/src/adapters/generation_mock.rs
//!
//! An offline `QuestionGenerationService` serving a fixed pool of questions per
//! category. Used when no generation backend is configured and as the fallback
//! when the configured one fails.

use async_trait::async_trait;
use conversation_deck_core::domain::Category;
use conversation_deck_core::ports::{
    GeneratedQuestion, GenerationRequest, PortResult, QuestionGenerationService,
};
use rand::seq::SliceRandom;

#[derive(Clone, Copy, Debug, Default)]
pub struct MockGenerationAdapter;

impl MockGenerationAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QuestionGenerationService for MockGenerationAdapter {
    async fn generate_questions(
        &self,
        request: &GenerationRequest,
    ) -> PortResult<Vec<GeneratedQuestion>> {
        let pool = canned_questions(request.category);
        let picked = pool.choose_multiple(&mut rand::thread_rng(), request.count);

        Ok(picked
            .map(|text| GeneratedQuestion {
                category: request.category,
                text: (*text).to_string(),
            })
            .collect())
    }
}

fn canned_questions(category: Category) -> &'static [&'static str] {
    match category {
        Category::Chill => &[
            "If you could master any instrument overnight, what would it be?",
            "What's the most random thing you're weirdly passionate about?",
            "What's your go-to comfort show that you've rewatched too many times?",
            "If your life had a theme song, what would it be?",
            "What's a food combination you love that others find strange?",
            "What's the last thing you impulse bought that you don't regret?",
            "If you had to eat one meal for the rest of your life, what would it be?",
            "What's a skill you wish you had but will probably never learn?",
            "What's the most useless talent you have?",
            "What's something you're irrationally afraid of?",
        ],
        Category::RealTalk => &[
            "What's a belief you held strongly that completely changed?",
            "When was the last time you surprised yourself?",
            "What's something you're still learning to accept about yourself?",
            "If you could have a conversation with your teenage self, what would you say?",
            "What keeps you going on your hardest days?",
            "What's the most important lesson life has taught you recently?",
            "What do you wish more people understood about you?",
            "When did you last feel truly at peace?",
            "What's something you need to forgive yourself for?",
            "What would your life look like if fear didn't exist?",
        ],
        Category::Relationships => &[
            "What's something you wish you knew before your first serious relationship?",
            "How do you know when it's time to fight for something vs. let it go?",
            "What's the most important lesson love has taught you?",
            "How has your definition of a healthy relationship evolved?",
            "What boundaries have you learned to set the hard way?",
            "What's something you used to tolerate in relationships that you no longer accept?",
            "How do you show love differently than you receive it?",
            "What's the hardest conversation you've had to have with a partner?",
            "What does emotional safety look like to you?",
            "How has your relationship with yourself affected your romantic relationships?",
        ],
        Category::Sex => &[
            "What's something that took you too long to feel comfortable asking for?",
            "How do you feel about discussing past experiences with a new partner?",
            "What's changed most about your perspective on intimacy as you've gotten older?",
            "What makes someone great at communicating in intimate moments?",
            "How do you handle mismatched expectations in the bedroom?",
            "What's something you wish was talked about more openly?",
            "How important is physical chemistry vs emotional connection?",
            "What's the biggest misconception about your intimate life?",
            "How do you navigate consent conversations?",
            "What makes you feel most desired?",
        ],
        Category::Dating => &[
            "What's a green flag that made you fall for someone immediately?",
            "What dating advice do you wish you could un-hear?",
            "How do you know when attraction is worth pursuing vs. just a fleeting feeling?",
            "What's something you've stopped compromising on in dating?",
            "How has your approach to dating changed in the last few years?",
            "What's the biggest lesson from your worst date?",
            "How do you know when someone is genuinely interested vs being polite?",
            "What's something you look for that most people overlook?",
            "How do you balance being open with protecting yourself?",
            "What's a dealbreaker that people think is unreasonable?",
        ],
        Category::TruthOrDare => &[
            "TRUTH: What's the most embarrassing thing you've done to impress someone?",
            "DARE: Text your ex 'I've been thinking about you' and show the response",
            "TRUTH: What's a secret you've kept from everyone in this room?",
            "DARE: Let the group choose your profile picture for 24 hours",
            "TRUTH: Who in this room would you trust with your deepest secret?",
            "DARE: Send a voice note singing to the last person you texted",
            "TRUTH: What's the pettiest reason you've ended things with someone?",
            "DARE: Post an unfiltered selfie right now with no caption",
            "TRUTH: What's the most recent lie you told?",
            "DARE: Let someone go through your search history for 30 seconds",
        ],
    }
}
