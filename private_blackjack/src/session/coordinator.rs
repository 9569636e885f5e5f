//! The session coordinator.
//!
//! Owns the participants, the dealer and the deck, and drives one round at a
//! time through betting, dealing, player actions, the dealer's turn and
//! settlement. It talks to participants only through a [`GameIo`], one
//! request at a time, in join order.

use crate::game::{
    UserError,
    constants::INITIAL_HAND_SIZE,
    entities::{Action, Card, Chips, Dealer, Deck, Participant, Phase, display_hand},
    functional::{
        Outcome, calculate_payout, dealer_should_hit, determine_outcome, hand_value,
        is_blackjack, is_bust, valid_actions,
    },
    views::GameView,
};

use super::{
    config::SessionConfig,
    io::{GameIo, IoError, Reply, Request},
};

/// How one participant's bet settled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settlement {
    pub name: String,
    pub bet: Chips,
    pub outcome: Outcome,
    pub payout: Chips,
}

/// What happened in a finished round.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RoundSummary {
    pub round: u32,
    pub settlements: Vec<Settlement>,
}

#[derive(Clone, Copy, Debug)]
enum Seat {
    Player(usize),
    Dealer,
}

pub struct Coordinator<I: GameIo> {
    io: I,
    config: SessionConfig,
    deck: Deck,
    dealer: Dealer,
    participants: Vec<Participant>,
    phase: Phase,
    round: u32,
    current: Option<usize>,
}

impl<I: GameIo> Coordinator<I> {
    pub fn new(io: I, config: SessionConfig) -> Self {
        Self::with_deck(io, config, Deck::default())
    }

    /// Start from a specific deck, e.g. a stacked one.
    pub fn with_deck(io: I, config: SessionConfig, deck: Deck) -> Self {
        Self {
            io,
            config,
            deck,
            dealer: Dealer::default(),
            participants: Vec::new(),
            phase: Phase::Lobby,
            round: 0,
            current: None,
        }
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    pub fn into_io(self) -> I {
        self.io
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.name == name)
    }

    pub fn dealer(&self) -> &Dealer {
        &self.dealer
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Snapshot of the table as every participant sees it right now.
    pub fn view(&self) -> GameView {
        let current = self
            .current
            .and_then(|idx| self.participants.get(idx))
            .map(|p| p.name.as_str());
        GameView::new(
            self.phase,
            self.round,
            current,
            &self.participants,
            &self.dealer,
        )
    }

    /// Play rounds until nobody is left or the session is told to stop.
    /// Returns how many rounds were played.
    pub async fn run(&mut self) -> Result<u32, IoError> {
        self.run_with(|_, _| {}).await
    }

    /// [`run`](Self::run), calling `on_round` with each finished round and
    /// the table after settlement.
    pub async fn run_with<F>(&mut self, mut on_round: F) -> Result<u32, IoError>
    where
        F: FnMut(&RoundSummary, &[Participant]) + Send,
    {
        let mut played = 0;
        while let Some(summary) = self.play_round().await? {
            played += 1;
            on_round(&summary, &self.participants);
            if !self.keep_playing().await? {
                break;
            }
        }
        log::info!("session over after {played} rounds");
        Ok(played)
    }

    /// Whether another round should follow the one that just finished.
    pub async fn keep_playing(&mut self) -> Result<bool, IoError> {
        if self.config.rounds_exhausted(self.round) {
            log::info!("reached the round limit of {}", self.config.max_rounds);
            return Ok(false);
        }
        self.io.keep_playing(self.round).await
    }

    /// Play one full round. Returns `None` without playing when nobody is
    /// seated.
    pub async fn play_round(&mut self) -> Result<Option<RoundSummary>, IoError> {
        self.sync_roster().await?;
        if self.participants.is_empty() {
            log::info!("no participants left, not dealing");
            return Ok(None);
        }

        self.betting().await?;
        if !self.participants.iter().any(Participant::in_round) {
            self.io.announce("Nobody placed a bet this round.").await?;
            self.set_phase(Phase::Results, None);
            self.publish().await?;
            return Ok(Some(RoundSummary {
                round: self.round,
                settlements: Vec::new(),
            }));
        }

        self.dealing().await?;
        self.player_actions().await?;
        self.dealer_turn().await?;
        let summary = self.results().await?;
        Ok(Some(summary))
    }

    /// Drop whoever left and seat whoever joined since the last round.
    async fn sync_roster(&mut self) -> Result<(), IoError> {
        let roster = self.io.roster().await;
        self.participants.retain(|p| {
            let keep = !p.departed && roster.contains(&p.name);
            if !keep {
                log::info!("{} left the table", p.name);
            }
            keep
        });
        for name in roster {
            if self.participants.iter().any(|p| p.name == name) {
                continue;
            }
            log::info!(
                "seating {name} with {} chips",
                self.config.starting_chips
            );
            self.participants
                .push(Participant::new(&name, self.config.starting_chips));
            self.io
                .announce(&format!(
                    "{name} takes a seat with {} chips.",
                    self.config.starting_chips
                ))
                .await?;
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: Phase, current: Option<usize>) {
        self.phase = phase;
        self.current = current;
    }

    async fn publish(&mut self) -> Result<(), IoError> {
        let view = self.view();
        self.io.publish(&view).await
    }

    fn name(&self, idx: usize) -> String {
        self.participants[idx].name.clone()
    }

    fn seated(&self) -> Vec<usize> {
        (0..self.participants.len())
            .filter(|&idx| self.participants[idx].in_round())
            .collect()
    }

    async fn betting(&mut self) -> Result<(), IoError> {
        self.round += 1;
        for participant in &mut self.participants {
            participant.reset_hand();
        }
        self.dealer.reset_hand();
        self.set_phase(Phase::Betting, None);
        log::info!(
            "round {} betting with {} participants",
            self.round,
            self.participants.len()
        );
        self.publish().await?;

        for idx in 0..self.participants.len() {
            let name = self.name(idx);
            if self.participants[idx].grant_stipend(self.config.stipend) {
                self.io
                    .announce(&format!(
                        "{name} is out of chips and receives {}.",
                        self.config.stipend
                    ))
                    .await?;
            }

            self.current = Some(idx);
            match self.collect_bet(idx).await {
                Ok(amount) => {
                    log::debug!("{name} bets {amount}");
                    self.io.announce(&format!("{name} bets {amount}.")).await?;
                }
                Err(err) if err.is_recoverable() => {
                    log::warn!("{name} sits out round {}: {err}", self.round);
                    if matches!(err, IoError::Disconnected(_)) {
                        self.participants[idx].departed = true;
                    }
                    self.io
                        .announce(&format!("{name} sits this round out."))
                        .await?;
                }
                Err(err) => return Err(err),
            }
            self.publish().await?;
        }
        self.current = None;
        Ok(())
    }

    async fn collect_bet(&mut self, idx: usize) -> Result<Chips, IoError> {
        let name = self.name(idx);
        loop {
            let chips = self.participants[idx].chips;
            let reply = self.io.request(&name, Request::Bet { chips }).await?;
            let placed = match reply {
                Reply::Bet(amount) => self.participants[idx].place_bet(amount),
                Reply::Action(_) | Reply::Unparsable(_) => Err(UserError::InvalidNumber),
            };
            match placed {
                Ok(amount) => return Ok(amount),
                Err(err) => self.io.reject(&name, &err.to_string()).await?,
            }
        }
    }

    fn in_play(&self) -> Vec<Card> {
        self.participants
            .iter()
            .flat_map(|p| p.hand.iter())
            .chain(self.dealer.hand.iter())
            .copied()
            .collect()
    }

    /// Deal one card to `seat`. `None` when every card is in play.
    fn draw(&mut self, seat: Seat) -> Option<Card> {
        let in_play = self.in_play();
        match self.deck.deal_card(&in_play) {
            Ok(card) => {
                match seat {
                    Seat::Player(idx) => self.participants[idx].hand.push(card),
                    Seat::Dealer => self.dealer.hand.push(card),
                }
                Some(card)
            }
            Err(err) => {
                log::warn!("can't deal to {seat:?}: {err}");
                None
            }
        }
    }

    async fn dealing(&mut self) -> Result<(), IoError> {
        let seated = self.seated();
        self.set_phase(Phase::Dealing, None);
        let needed = INITIAL_HAND_SIZE * (seated.len() + 1);
        if self.deck.ensure(needed) {
            log::info!("reshuffled the deck before dealing round {}", self.round);
        }

        for &idx in &seated {
            for _ in 0..INITIAL_HAND_SIZE {
                self.draw(Seat::Player(idx));
            }
        }
        for _ in 0..INITIAL_HAND_SIZE {
            self.draw(Seat::Dealer);
        }
        self.publish().await?;

        // The dealer's natural waits for the hole card.
        for &idx in &seated {
            if is_blackjack(&self.participants[idx].hand) {
                let name = self.name(idx);
                self.io
                    .announce(&format!("{name} has a natural blackjack!"))
                    .await?;
            }
        }
        Ok(())
    }

    async fn player_actions(&mut self) -> Result<(), IoError> {
        self.set_phase(Phase::PlayerAction, None);
        for idx in self.seated() {
            self.current = Some(idx);
            self.play_turn(idx).await?;
        }
        self.current = None;
        Ok(())
    }

    async fn play_turn(&mut self, idx: usize) -> Result<(), IoError> {
        let name = self.name(idx);
        while !self.participants[idx].must_stand {
            self.publish().await?;
            let action = match self.next_action(idx).await {
                Ok(action) => action,
                Err(err) if err.is_recoverable() => {
                    log::warn!("{name} stands by default: {err}");
                    if matches!(err, IoError::Disconnected(_)) {
                        self.participants[idx].departed = true;
                    }
                    self.participants[idx].must_stand = true;
                    self.io.announce(&format!("{name} stands.")).await?;
                    break;
                }
                Err(err) => return Err(err),
            };

            match action {
                Action::Hit => {
                    let Some(card) = self.draw(Seat::Player(idx)) else {
                        self.participants[idx].must_stand = true;
                        continue;
                    };
                    self.io
                        .announce(&format!("{name} hits and draws {card}."))
                        .await?;
                    if is_bust(&self.participants[idx].hand) {
                        self.participants[idx].must_stand = true;
                        self.io.announce(&format!("{name} is bust!")).await?;
                    }
                }
                Action::Stand => {
                    self.participants[idx].must_stand = true;
                    self.io.announce(&format!("{name} stands.")).await?;
                }
                Action::Double => {
                    // Not enough chips to cover it: back to the prompt.
                    if !self.participants[idx].double_bet() {
                        continue;
                    }
                    self.participants[idx].must_stand = true;
                    let bet = self.participants[idx].current_bet;
                    match self.draw(Seat::Player(idx)) {
                        Some(card) => {
                            self.io
                                .announce(&format!(
                                    "{name} doubles to {bet} and draws {card}."
                                ))
                                .await?;
                        }
                        None => continue,
                    }
                    if is_bust(&self.participants[idx].hand) {
                        self.io
                            .announce(&format!("{name} is bust after doubling down!"))
                            .await?;
                    }
                }
            }
        }
        self.publish().await
    }

    /// Prompt until the participant names an action that's on offer.
    async fn next_action(&mut self, idx: usize) -> Result<Action, IoError> {
        let name = self.name(idx);
        loop {
            let hand = &self.participants[idx].hand;
            let choices = valid_actions(hand);
            let offered = choices
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let prompt = format!(
                "{name}, your hand is {} ({}). Choose an action ({offered}):",
                display_hand(hand),
                hand_value(hand)
            );

            let reply = self
                .io
                .request(
                    &name,
                    Request::Action {
                        prompt,
                        choices: choices.clone(),
                    },
                )
                .await?;
            let text = match reply {
                Reply::Action(text) | Reply::Unparsable(text) => text,
                Reply::Bet(amount) => amount.to_string(),
            };
            match text.parse::<Action>() {
                Ok(action) if choices.contains(&action) => return Ok(action),
                Ok(action) => {
                    let err = UserError::ActionNotAvailable(action);
                    self.io.reject(&name, &err.to_string()).await?;
                }
                Err(err) => self.io.reject(&name, &err.to_string()).await?,
            }
        }
    }

    async fn dealer_turn(&mut self) -> Result<(), IoError> {
        self.set_phase(Phase::DealerTurn, None);
        self.publish().await?;
        if is_blackjack(&self.dealer.hand) {
            self.io.announce("Dealer has a natural blackjack!").await?;
        }
        while dealer_should_hit(&self.dealer.hand) {
            let Some(card) = self.draw(Seat::Dealer) else {
                break;
            };
            log::debug!("dealer draws {card}");
            self.io
                .announce(&format!("Dealer hits and draws {card}."))
                .await?;
            self.publish().await?;
        }
        let hand = &self.dealer.hand;
        let text = if is_bust(hand) {
            format!("Dealer busts with {}.", display_hand(hand))
        } else {
            format!(
                "Dealer stands with {} ({}).",
                display_hand(hand),
                hand_value(hand)
            )
        };
        self.io.announce(&text).await?;
        self.publish().await
    }

    async fn results(&mut self) -> Result<RoundSummary, IoError> {
        self.set_phase(Phase::Results, None);
        let mut settlements = Vec::new();
        for idx in self.seated() {
            let participant = &mut self.participants[idx];
            let outcome = determine_outcome(&participant.hand, &self.dealer.hand);
            let payout = calculate_payout(participant.current_bet, outcome);
            participant.chips = participant.chips.saturating_add(payout);
            settlements.push(Settlement {
                name: participant.name.clone(),
                bet: participant.current_bet,
                outcome,
                payout,
            });
        }

        for settlement in &settlements {
            let Settlement {
                name,
                outcome,
                payout,
                ..
            } = settlement;
            log::info!("round {}: {name} {outcome}, paid {payout}", self.round);
            let text = match outcome {
                Outcome::Blackjack => format!("{name} has blackjack! Receives {payout} chips."),
                Outcome::Win => format!("{name} wins! Receives {payout} chips."),
                Outcome::Push => format!("{name} pushes. Receives {payout} chips back."),
                Outcome::Lose => format!("{name} loses."),
            };
            self.io.announce(&text).await?;
        }

        for idx in 0..self.participants.len() {
            let stipend = self.config.stipend;
            if self.participants[idx].grant_stipend(stipend) {
                let name = self.name(idx);
                self.io
                    .announce(&format!("{name} is out of chips and receives {stipend}."))
                    .await?;
            }
        }

        self.publish().await?;
        Ok(RoundSummary {
            round: self.round,
            settlements,
        })
    }
}
