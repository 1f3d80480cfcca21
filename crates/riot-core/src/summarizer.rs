//! Plain-text fleet summaries sent to the AI alongside each question.
//!
//! Everything here is a pure function of the snapshot. The context is
//! always the aggregate block, then the per-herd block, then (only when an
//! animal is selected) the selected-animal block.

use crate::models::{Animal, AnimalStatus, Herd};

const UNKNOWN: &str = "Desconhecido";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub healthy: usize,
    pub warning: usize,
    pub danger: usize,
}

impl StatusCounts {
    pub fn tally<'a>(animals: impl IntoIterator<Item = &'a Animal>) -> Self {
        let mut counts = Self::default();
        for animal in animals {
            match animal.status {
                AnimalStatus::Healthy => counts.healthy += 1,
                AnimalStatus::Warning => counts.warning += 1,
                AnimalStatus::Danger => counts.danger += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: AnimalStatus) -> usize {
        match status {
            AnimalStatus::Healthy => self.healthy,
            AnimalStatus::Warning => self.warning,
            AnimalStatus::Danger => self.danger,
        }
    }

    pub fn total(&self) -> usize {
        self.healthy + self.warning + self.danger
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetStats {
    pub total: usize,
    pub counts: StatusCounts,
}

pub fn fleet_stats(animals: &[Animal]) -> FleetStats {
    FleetStats {
        total: animals.len(),
        counts: StatusCounts::tally(animals),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HerdStats<'a> {
    pub herd: &'a Herd,
    pub total: usize,
    pub counts: StatusCounts,
    /// Names of animals flagged outside the designated area, in snapshot order
    pub out_of_area: Vec<&'a str>,
}

pub fn herd_stats<'a>(herd: &'a Herd, animals: &'a [Animal]) -> HerdStats<'a> {
    let members: Vec<&Animal> = animals.iter().filter(|a| a.herd_id == herd.id).collect();

    HerdStats {
        herd,
        total: members.len(),
        counts: StatusCounts::tally(members.iter().copied()),
        out_of_area: members
            .iter()
            .copied()
            .filter(|a| a.is_out_of_area())
            .map(|a| a.name.as_str())
            .collect(),
    }
}

pub fn aggregate_block(animals: &[Animal]) -> String {
    let stats = fleet_stats(animals);
    format!(
        "RESUMO GERAL:\n\
         - Total de animais: {}\n\
         - Saudáveis: {}\n\
         - Em alerta: {}\n\
         - Em perigo: {}\n",
        stats.total, stats.counts.healthy, stats.counts.warning, stats.counts.danger
    )
}

pub fn herd_block(animals: &[Animal], herds: &[Herd]) -> String {
    let mut block = String::from("RESUMO POR REBANHO:\n");

    if herds.is_empty() {
        block.push_str("- Nenhum rebanho cadastrado.\n");
        return block;
    }

    for herd in herds {
        let stats = herd_stats(herd, animals);
        let out_of_area = if stats.out_of_area.is_empty() {
            "Animais fora da área: 0.".to_string()
        } else {
            format!(
                "Animais fora da área: {} ({}).",
                stats.out_of_area.len(),
                stats.out_of_area.join(", ")
            )
        };

        block.push_str(&format!(
            "- Rebanho \"{}\": {} animais. (Saudáveis: {}, Alerta: {}, Perigo: {}). {}\n",
            herd.name,
            stats.total,
            stats.counts.healthy,
            stats.counts.warning,
            stats.counts.danger,
            out_of_area
        ));
    }

    block
}

/// Attribute dump and day-by-day history of one animal
pub fn selected_animal_block(animal: &Animal, herds: &[Herd]) -> String {
    let herd_info = herds
        .iter()
        .find(|h| h.id == animal.herd_id)
        .map(|h| format!("do Rebanho {} (Região: {})", h.name, h.region))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let alert = animal
        .alert
        .as_deref()
        .filter(|a| !a.is_empty())
        .map(|a| format!("- ALERTA ATIVO: {}\n", a))
        .unwrap_or_default();

    let mut block = format!(
        "DADOS DO ANIMAL SELECIONADO (HOJE):\n\
         - Nome: {} (Colar: {})\n\
         - Rebanho: {}\n\
         - Tipo: {}\n\
         - Raça: {}\n\
         - Idade: {} meses\n\
         - Peso: {} kg\n\
         - Status: {}\n\
         {}\
         - Temperatura: {}°C\n\
         - Passos: {}\n\
         - Localização: Lat {:.4}, Lng {:.4}\n",
        animal.name,
        animal.collar_id,
        herd_info,
        animal.kind,
        animal.breed,
        animal.age,
        animal.weight,
        animal.status.label(),
        alert,
        animal.temperature,
        animal.steps,
        animal.location.lat,
        animal.location.lng
    );

    let history = animal.history();
    if !history.is_empty() {
        block.push_str("\nHISTÓRICO DA SEMANA:\n");
        // Supplied order, no re-sorting
        for record in history {
            block.push_str(&format!(
                "- Data: {}, Status: {}, Temp: {:.1}°C, Passos: {}\n",
                record.date,
                record.status.label(),
                record.temperature,
                record.steps
            ));
        }
    }

    block
}

pub fn build_context(animals: &[Animal], herds: &[Herd], selected: Option<&Animal>) -> String {
    let mut context = String::from("CONTEXTO ATUAL DA FAZENDA:\n\n");
    context.push_str(&aggregate_block(animals));
    context.push('\n');
    context.push_str(&herd_block(animals, herds));

    if let Some(animal) = selected {
        context.push('\n');
        context.push_str(&selected_animal_block(animal, herds));
    }

    context
}

/// Context followed by the literal user question
pub fn build_prompt(context: &str, question: &str) -> String {
    format!("{}\n\nPERGUNTA DO USUÁRIO: {}", context, question)
}
