//! Static prompt texts. All user-facing content is German, matching the
//! deployed product. Generation templates use `{name}` placeholders filled
//! by [`render`].

/// Fill `{name}` placeholders in a template.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

pub mod dog {
    pub const GREETING: &str =
        "Hallo! Schön, dass Du da bist. Ich erkläre Dir Hundeverhalten aus der Hundeperspektive.";
    pub const GREETING_FOLLOWUP: &str = "Erzähl mal, was ist denn bei euch so los?";
    pub const NEED_MORE_DETAIL: &str = "Kannst Du das bitte etwas ausführlicher beschreiben?";
    pub const ASK_FOR_MORE: &str = "Magst Du mehr davon erfahren, warum ich mich so verhalte?";
    pub const CONTEXT_QUESTION: &str = "Gut, dann brauche ich noch ein paar Informationen. \
         Wie kam es zu der Situation? Wer war dabei und wo ist es passiert?";
    pub const NEED_MORE_CONTEXT: &str =
        "Ich brauche noch ein bisschen mehr Info… Wo war das genau, was war da los?";
    pub const EXERCISE_QUESTION: &str = "Möchtest du eine Anleitung, wie Du mit Deinem Hund üben \
         kannst, dass sich das verbessert?";
    pub const CONTINUE_OR_RESTART: &str = "Möchtest du ein weiteres Hundeverhalten eingeben?";
    pub const REQUEST_YES_NO: &str = "Bitte sag entweder 'Ja' oder 'Nein'.";
    pub const NO_MATCH_FOUND: &str = "Hmm, zu diesem Verhalten habe ich leider noch keine Antwort. \
         Magst du ein anderes Hundeverhalten beschreiben?";
    pub const NOT_DOG_RELATED: &str = "Hm, das klingt für mich nicht nach typischem Hundeverhalten. \
         Magst du es nochmal anders beschreiben?";
    pub const DIAGNOSIS_INTRO: &str = "Danke. Aus der Hundeperspektive sieht das so aus:";
    pub const ANOTHER_BEHAVIOR: &str = "Super! Beschreibe mir bitte ein anderes Verhalten.";
    pub const TECHNICAL_ERROR: &str =
        "Entschuldige, es ist ein Problem aufgetreten. Lass uns neu starten.";
    pub const INVALID_INPUT_ERROR: &str = "Das ist etwas kurz. Kannst du mir mehr Details geben?";
    pub const RESTART_CONFIRMED: &str = "Okay, wir starten neu. Was möchtest du mir erzählen?";
    pub const GENERAL_ERROR: &str =
        "Es tut mir leid, ich verstehe gerade nicht ganz. Kannst du es nochmal versuchen?";
    pub const NOT_UNDERSTOOD: &str =
        "Ich habe deine Eingabe nicht verstanden. Kannst du es anders formulieren?";
    pub const FALLBACK_EXERCISE: &str = "Übe täglich 10 Minuten Impulskontrolle mit deinem Hund \
         durch klare Kommandos und Belohnungen.";
}

pub mod companion {
    pub const FEEDBACK_INTRO: &str =
        "Ich würde mich freuen, wenn du mir noch ein kurzes Feedback gibst.";
    pub const FEEDBACK_Q1: &str =
        "Hast Du das Gefühl, dass Dir die Beratung bei Deinem Anliegen weitergeholfen hat?";
    pub const FEEDBACK_Q2: &str = "Wie fandest Du die Sichtweise des Hundes – was hat Dir daran \
         gefallen oder vielleicht irritiert?";
    pub const FEEDBACK_Q3: &str =
        "Was denkst Du über die vorgeschlagene Übung – passt sie zu Deiner Situation?";
    pub const FEEDBACK_Q4: &str = "Auf einer Skala von 0-10: Wie wahrscheinlich ist es, dass Du \
         Wuffchat weiterempfiehlst?";
    pub const FEEDBACK_Q5: &str = "Optional: Deine E-Mail oder Telefonnummer für eventuelle \
         Rückfragen. Diese wird ausschließlich für Rückfragen zu deinem Feedback verwendet und \
         nach 3 Monaten automatisch gelöscht.";
    pub const FEEDBACK_ACK: &str = "Danke.";
    pub const FEEDBACK_COMPLETE: &str = "Danke für Dein Feedback! 🐾";
    pub const FEEDBACK_COMPLETE_NOSAVE: &str =
        "Danke für Dein Feedback! Leider konnte ich es gerade nicht speichern.";
    pub const GENERAL_ERROR: &str =
        "Entschuldige, da ist etwas schiefgegangen. Lass uns weitermachen.";

    pub const QUESTIONS: [&str; 5] = [FEEDBACK_Q1, FEEDBACK_Q2, FEEDBACK_Q3, FEEDBACK_Q4, FEEDBACK_Q5];
}

pub mod templates {
    /// System prompt keeping the generator on the provided content.
    pub const DOG_AGENT_SYSTEM: &str = "Du bist ein Textverarbeiter, der bereitgestellte Inhalte \
         wiedergibt.\nDeine Aufgabe: Wähle passende Textteile aus und gib sie wieder.\nErfinde \
         KEINE neuen Inhalte. Verwende einfache, direkte Sprache.\nBleibe bei den Fakten aus den \
         bereitgestellten Texten.";

    pub const DOG_PERSPECTIVE: &str = "Verhalten: '{symptom}'\n\n\
         Bereitgestellte Information: {match}\n\n\
         DEINE AUFGABE:\n\
         - Formuliere {match} aus der Hundeperspektive, so als ob Du es erlebt hast und darüber berichtest.\n\
         - Bleibe EXAKT bei den Inhalten aus {match}\n\
         - KEIN \"Woof\", keine Ausrufe, keine Fragen an den Menschen\n\
         - Einfache, ruhige Sprache\n\n\
         Nur 4 Sätze. NUR den Text aus {match} umformulieren.";

    pub const INSTINCT_DIAGNOSIS: &str = "Verhalten: {symptom}\n\
         Kontext: {context}\n\n\
         Instinktbeschreibungen aus der Datenbank:\n\
         - Jagd: {jagd}\n\
         - Rudel: {rudel}\n\
         - Territorial: {territorial}\n\
         - Sexual: {sexual}\n\n\
         AUFGABE: Wähle die passende Instinktbeschreibung und gib sie wieder.\n\
         - Vergleiche {symptom} und {context} mit den vier Beschreibungen\n\
         - Wähle die Beschreibung, die am besten passt\n\
         - Verwende NUR Sätze/Teile aus den obigen Instinktbeschreibungen\n\
         - Passe sie minimal an die Situation an (z.B. \"Enten\" statt \"Beute\")\n\
         - KEINE eigenen Sätze erfinden, nur umformulieren\n\n\
         Maximal 8 Sätze. Nur aus den bereitgestellten Texten.";

    pub const INSTINCT_ANALYSIS: &str = "Vergleiche diese Kombination aus Verhalten und Kontext \
         mit den vier Instinktvarianten:\n\
         Verhalten: {symptom}\n\
         Zusätzlicher Kontext: {context}\n\n\
         Identifiziere den oder die führenden Instinkte (Jagd, Rudel, Territorial, Sexual).\n\
         Erkläre dann aus Hundesicht (Ich-Form), warum dieser Instinkt/diese Instinkte in dieser \
         Situation aktiv ist/sind.\n\n\
         Halte die Erklärung einfach, emotional und vermeide Fachbegriffe.";
}
