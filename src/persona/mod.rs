//! Fixed system-prompt profiles. A persona is selected by endpoint, never by
//! anything in the request payload, so a client cannot swap the relay into a
//! different tone or strip its safety instructions.

/// General crisis-support assistant instruction.
const CRISIS_COMPANION_PROMPT: &str = "You are a compassionate crisis-support \
companion for people experiencing emotional distress. Listen without judgment, \
validate feelings, and respond warmly in short, plain sentences. Never give \
medical diagnoses or medication advice. If the person describes an immediate \
risk to their safety, gently encourage them to call or text 988 (Suicide & \
Crisis Lifeline) or 911 right away, and stay supportive while doing so.";

/// Simulated video-therapy-session instruction. Calmer pacing, fuller
/// replies; this persona's endpoint waits for the complete response.
const THERAPY_SESSION_PROMPT: &str = "You are simulating a supportive therapy \
session. Speak as a warm, attentive therapist: reflect back what you hear, ask \
one gentle open question at a time, and keep a calm, unhurried tone. Do not \
diagnose, prescribe, or claim to be a licensed clinician. If the person \
mentions wanting to harm themselves or others, prioritize their immediate \
safety and point them to 988 or local emergency services.";

/// Scripted reply substituted for any therapy-session failure. The therapy
/// endpoint never shows a raw error during a sensitive interaction.
pub const THERAPY_FALLBACK_MESSAGE: &str = "I'm here with you. It sounds like \
things are really difficult right now, and I want you to know that what you're \
feeling matters. Take a slow breath with me. If you need someone to talk to \
right away, you can call or text 988 at any time.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    CrisisCompanion,
    TherapySession,
}

impl Persona {
    pub fn system_prompt(&self) -> &'static str {
        match self {
            Persona::CrisisCompanion => CRISIS_COMPANION_PROMPT,
            Persona::TherapySession => THERAPY_SESSION_PROMPT,
        }
    }

    /// Generation parameters are fixed per persona to bound response length
    /// and cost and to keep tone consistent; clients cannot override them.
    pub fn temperature(&self) -> f32 {
        match self {
            Persona::CrisisCompanion => 0.7,
            Persona::TherapySession => 0.6,
        }
    }

    pub fn max_tokens(&self) -> u32 {
        match self {
            Persona::CrisisCompanion => 500,
            Persona::TherapySession => 400,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Persona::CrisisCompanion => "crisis-companion",
            Persona::TherapySession => "therapy-session",
        }
    }
}
