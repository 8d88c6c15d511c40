//! Message templates sent to players and groups.
//!
//! Every function here is deterministic: the same inputs always render the
//! same text, which keeps outgoing messages reproducible in tests.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::capacity::{Admission, Capacity, RosterCounts};
use crate::models::confirmation::Attendance;
use crate::models::game::Game;
use crate::models::notification::MessageKind;
use crate::models::session::Session;

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "segunda-feira",
        Weekday::Tue => "terça-feira",
        Weekday::Wed => "quarta-feira",
        Weekday::Thu => "quinta-feira",
        Weekday::Fri => "sexta-feira",
        Weekday::Sat => "sábado",
        Weekday::Sun => "domingo",
    }
}

/// `segunda-feira, 10/06/2024`
pub fn format_date(date: NaiveDate) -> String {
    format!("{}, {}", weekday_name(date.weekday()), date.format("%d/%m/%Y"))
}

/// `19:00 às 21:00`
pub fn format_time_window(session: &Session) -> String {
    format!(
        "{} às {}",
        session.start_time.format("%H:%M"),
        session.end_time.format("%H:%M")
    )
}

fn headline(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Confirmation => "⚽ Confirmação de presença",
        MessageKind::Reminder => "⏰ Lembrete: confirme sua presença",
        MessageKind::FinalConfirmation => "🚨 Última chamada para confirmar presença",
    }
}

/// Text of a scheduled notification.
pub fn notification_text(
    game: &Game,
    session: &Session,
    kind: MessageKind,
    roster: &RosterCounts,
) -> String {
    let capacity = Capacity::from(game.shape);
    format!(
        "{headline}\n\n\
         *{organization}*\n\
         📍 {location}\n\
         📅 {date}\n\
         🕖 {window}\n\n\
         ✅ Confirmados: {confirmed}\n\
         🎟️ Vagas restantes: {remaining}\n\n\
         Responda *SIM* para confirmar ou *NÃO* para recusar.\n\
         Se tiver mais de um jogo pendente, responda *CONFIRMAR {session_id}* ou *RECUSAR {session_id}*.",
        headline = headline(kind),
        organization = game.organization_name,
        location = game.location,
        date = format_date(session.date),
        window = format_time_window(session),
        confirmed = roster.confirmed,
        remaining = capacity.remaining_slots(roster),
        session_id = session.id,
    )
}

/// Answer to a confirmation reply.
pub fn admission_reply(game: &Game, session: &Session, admission: &Admission, roster: &RosterCounts) -> String {
    let date = format_date(session.date);
    match admission {
        Admission::Admitted {
            remaining_slots,
            goalkeeper_slots_reserved,
        } => {
            let mut text = format!(
                "✅ Presença confirmada no {} de {}! Vagas restantes: {}.",
                game.organization_name, date, remaining_slots
            );
            if *goalkeeper_slots_reserved {
                let reserved = game
                    .shape
                    .number_of_teams
                    .saturating_sub(roster.confirmed_goalkeepers);
                text.push_str(&format!(
                    "\nObs.: {} vaga(s) reservada(s) para goleiros ainda não confirmados.",
                    reserved
                ));
            }
            text
        }
        Admission::AlreadyAdmitted { remaining_slots } => format!(
            "👍 Você já está confirmado para {}. Vagas restantes: {}.",
            date, remaining_slots
        ),
        Admission::Waitlisted { position } => format!(
            "📋 O jogo de {} está lotado. Você entrou na lista de espera na posição {}.",
            date, position
        ),
        Admission::AlreadyWaitlisted { position } => format!(
            "📋 Você continua na lista de espera para {}, posição {}.",
            date, position
        ),
    }
}

pub fn decline_reply(session: &Session) -> String {
    format!(
        "❌ Presença recusada para {}. Obrigado por avisar!",
        format_date(session.date)
    )
}

pub fn promotion_notice(game: &Game, session: &Session) -> String {
    format!(
        "🎉 Abriu uma vaga! Você saiu da lista de espera e está confirmado no {} de {} ({}).",
        game.organization_name,
        format_date(session.date),
        format_time_window(session)
    )
}

/// Live attendance list posted to the group chat.
pub fn roster_text(game: &Game, session: &Session, attendance: &Attendance) -> String {
    let capacity = Capacity::from(game.shape);
    let counts = attendance.counts();

    let mut text = format!(
        "📋 *Lista de presença* - {}\n📅 {}\n🕖 {}\n\n✅ Confirmados ({}/{}):\n",
        game.organization_name,
        format_date(session.date),
        format_time_window(session),
        counts.confirmed,
        capacity.effective_max(&counts),
    );

    if attendance.admitted.is_empty() {
        text.push_str("Ninguém confirmado ainda.\n");
    }
    for (index, player) in attendance.admitted.iter().enumerate() {
        let marker = if player.is_goalkeeper() { " 🧤" } else { "" };
        text.push_str(&format!("{}. {}{}\n", index + 1, player.name, marker));
    }

    if !attendance.waiting.is_empty() {
        text.push_str("\n⏳ Lista de espera:\n");
        for (entry, player) in &attendance.waiting {
            text.push_str(&format!("{}. {}\n", entry.position, player.name));
        }
    }

    text.push_str(&format!(
        "\n🎟️ Vagas restantes: {}",
        capacity.remaining_slots(&counts)
    ));
    text
}
