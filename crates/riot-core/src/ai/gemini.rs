use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GeminiConfig;
use crate::error::{Error, Result};
use crate::models::UserLocation;
use crate::state::GroundingSource;
use crate::summarizer::build_prompt;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const SYSTEM_INSTRUCTION: &str = "Você é um assistente de IA para a plataforma R-IoT, um sistema de monitoramento de gado. Sua função é responder a perguntas sobre o estado do rebanho com base nos dados fornecidos no contexto.
- O contexto sempre conterá um 'RESUMO GERAL' e um 'RESUMO POR REBANHO'. Use estas seções para responder a perguntas gerais sobre a fazenda ou rebanhos específicos. O resumo do rebanho inclui os nomes de animais com alertas importantes, como os que estão 'Fora da área'. Use esta informação para identificar animais específicos quando perguntado.
- Se nenhum animal estiver selecionado, suas análises devem ser amplas, considerando todos os animais e rebanhos com base nos resumos.
- Se um animal específico for selecionado, seus dados aparecerão na seção 'DADOS DO ANIMAL SELECIONADO'. Use esses dados para perguntas sobre este animal, mas lembre-se que você ainda tem o contexto geral para responder sobre outros animais ou rebanhos.
- Analise o histórico de 7 dias de um animal para identificar tendências, como uma queda nos passos ou um aumento gradual da temperatura, quando relevante.
- Seja conciso e direto. Você está auxiliando um fazendeiro ou gerente de fazenda a entender os dados em tempo real. Não responda a perguntas que não sejam sobre os dados fornecidos.";

/// Text answer plus the citations it was grounded on
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistantReply {
    pub text: String,
    pub sources: Vec<GroundingSource>,
}

/// The hosted model that answers herd questions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Assistant: Send + Sync {
    async fn ask(
        &self,
        question: &str,
        context: &str,
        location: Option<UserLocation>,
        config: &GeminiConfig,
    ) -> Result<AssistantReply>;
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_maps: serde_json::Value,
}

#[derive(Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RetrievalConfig {
    lat_lng: LatLng,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolConfig {
    retrieval_config: RetrievalConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<ToolConfig>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Default)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ChunkSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    maps: Option<ChunkSource>,
    web: Option<ChunkSource>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: ResponseContent,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeminiClient {
    pub fn new() -> Self {
        Self::with_base_url(API_BASE)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_request(
        question: &str,
        context: &str,
        location: Option<UserLocation>,
        config: &GeminiConfig,
    ) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: build_prompt(context, question) }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: SYSTEM_INSTRUCTION.to_string() }],
            },
            tools: vec![Tool { google_maps: serde_json::json!({}) }],
            tool_config: location.map(|loc| ToolConfig {
                retrieval_config: RetrievalConfig {
                    lat_lng: LatLng {
                        latitude: loc.latitude,
                        longitude: loc.longitude,
                    },
                },
            }),
            generation_config: GenerationConfig {
                temperature: config.temperature,
            },
        }
    }
}

#[async_trait]
impl Assistant for GeminiClient {
    async fn ask(
        &self,
        question: &str,
        context: &str,
        location: Option<UserLocation>,
        config: &GeminiConfig,
    ) -> Result<AssistantReply> {
        if !config.has_api_key() {
            return Err(Error::MissingApiKey);
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, config.model.as_str());
        let request = Self::build_request(question, context, location, config);

        tracing::debug!(model = config.model.as_str(), key = %config.redacted_key(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &config.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(Error::Api(format!("{}: {}", status, message)));
        }

        let body = response.bytes().await?;
        parse_reply(&body)
    }
}

fn parse_reply(body: &[u8]) -> Result<AssistantReply> {
    let response: GenerateResponse = serde_json::from_slice(body)?;
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Api("response had no candidates".to_string()))?;

    let text: String = candidate
        .content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(Error::Api("response had no text".to_string()));
    }

    let sources = candidate
        .grounding_metadata
        .unwrap_or_default()
        .grounding_chunks
        .into_iter()
        .filter_map(|chunk| chunk.maps.or(chunk.web))
        .filter_map(|src| {
            src.uri.map(|uri| GroundingSource { title: src.title, uri })
        })
        .collect();

    Ok(AssistantReply { text, sources })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfigUpdate;

    #[test]
    fn test_request_shape_with_location() {
        let config = GeminiConfig::default().update(GeminiConfigUpdate {
            temperature: Some(1.5),
            ..Default::default()
        });
        let location = Some(UserLocation { latitude: -22.5, longitude: -47.25 });
        let request = GeminiClient::build_request("Onde está a Mimosa?", "CTX", location, &config);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json["contents"][0]["parts"][0]["text"],
            "CTX\n\nPERGUNTA DO USUÁRIO: Onde está a Mimosa?"
        );
        assert_eq!(json["contents"][0]["role"], "user");
        assert!(json["systemInstruction"].get("role").is_none());
        assert!(json["tools"][0]["googleMaps"].is_object());
        assert_eq!(json["toolConfig"]["retrievalConfig"]["latLng"]["latitude"], -22.5);
        assert_eq!(json["generationConfig"]["temperature"], 1.5);
    }

    #[test]
    fn test_request_without_location_omits_tool_config() {
        let request = GeminiClient::build_request("q", "c", None, &GeminiConfig::default());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("toolConfig").is_none());
    }

    #[test]
    fn test_parse_reply_with_map_citations() {
        let body = br#"{
            "candidates": [{
                "content": {"parts": [{"text": "A Mimosa est"}, {"text": "\u00e1 no pasto 3."}]},
                "groundingMetadata": {"groundingChunks": [
                    {"maps": {"uri": "https://maps.google.com/?cid=1", "title": "Fazenda Boa Vista"}},
                    {"web": {"uri": "https://example.org/clima"}},
                    {"maps": {"title": "sem uri"}}
                ]}
            }]
        }"#;
        let reply = parse_reply(body).unwrap();
        assert_eq!(reply.text, "A Mimosa está no pasto 3.");
        assert_eq!(reply.sources.len(), 2);
        assert_eq!(reply.sources[0].display_title(), "Fazenda Boa Vista");
        assert_eq!(reply.sources[1].title, None);
        assert_eq!(reply.sources[1].display_title(), "Ver no mapa");
    }

    #[test]
    fn test_parse_reply_without_candidates_is_error() {
        assert!(matches!(parse_reply(br#"{"candidates": []}"#), Err(Error::Api(_))));
        assert!(matches!(parse_reply(b"not json"), Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let client = GeminiClient::with_base_url("http://127.0.0.1:9");
        let result = client.ask("q", "c", None, &GeminiConfig::default()).await;
        assert!(matches!(result, Err(Error::MissingApiKey)));
    }
}
