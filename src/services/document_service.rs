// src/services/document_service.rs

use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, FixedOffset, Utc};
use genpdf::{elements, style, Alignment, Element};
use image::{DynamicImage, Rgb, RgbImage};

use crate::{
    common::error::AppError,
    models::inspection::{Inspection, Resposta, Treatment, TreatmentStatus},
    services::image_store::ImageStore,
};

// Layout fixo do relatório
const PAGE_MARGIN_MM: i32 = 10;
const TITLE_FONT_SIZE: u8 = 16;
const SECTION_FONT_SIZE: u8 = 11;
const BODY_FONT_SIZE: u8 = 9;
const SIGNATURE_SCALE: f64 = 0.35;

// Horário de Brasília (sem horário de verão)
const LOCAL_OFFSET_SECS: i32 = -3 * 3600;

fn local_time(at: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(LOCAL_OFFSET_SECS) {
        Some(offset) => at.with_timezone(&offset).format("%d/%m/%Y %H:%M").to_string(),
        None => at.format("%d/%m/%Y %H:%M UTC").to_string(),
    }
}

fn or_dash(value: &str) -> String {
    if value.trim().is_empty() { "-".to_string() } else { value.trim().to_string() }
}

// --- MODELO DO RELATÓRIO ---

#[derive(Debug, Clone, PartialEq)]
pub struct ReportField {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportItem {
    pub numero: usize,
    pub pergunta: String,
    pub resposta: String,
    pub observacao: Option<String>,
    pub fotos: usize,
    pub tratativa: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSignature {
    pub legenda: &'static str,
    pub nome: String,
    pub detalhe: Option<String>,
    pub imagem_url: Option<String>,
}

/// Tudo o que vai impresso, já formatado. Montado sem I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionReport {
    pub titulo: String,
    pub cabecalho: Vec<(ReportField, ReportField)>,
    pub itens: Vec<ReportItem>,
    pub observacoes: String,
    pub assinatura_mantenedor: ReportSignature,
    pub assinatura_pcm: ReportSignature,
    pub filename: String,
}

fn response_text(response: Resposta, recurrence: bool) -> String {
    let base = match response {
        Resposta::C => "C - Conforme",
        Resposta::Nc => "NC - Não conforme",
        Resposta::Na => "NA - Não se aplica",
    };
    if recurrence { format!("{} (recorrente)", base) } else { base.to_string() }
}

fn treatment_text(treatment: &Treatment) -> String {
    let status = match treatment.status {
        TreatmentStatus::Open => "Aberta",
        TreatmentStatus::InProgress => "Em andamento",
        TreatmentStatus::Resolved => "Resolvida",
    };
    let mut parts = vec![format!("Tratativa: {}", status)];
    if let Some(summary) = treatment.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(summary.trim().to_string());
    }
    if let Some(responsible) = treatment.responsible.as_deref().filter(|s| !s.trim().is_empty()) {
        parts.push(format!("Responsável: {}", responsible.trim()));
    }
    if let Some(due) = treatment.due_date {
        parts.push(format!("Prazo: {}", due.format("%d/%m/%Y")));
    }
    parts.join(" | ")
}

// Nome de arquivo seguro para o Content-Disposition: só ASCII visível, sem aspas
fn filename_part(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "maquina".to_string()
    } else {
        cleaned
    }
}

fn field(label: &'static str, value: impl Into<String>) -> ReportField {
    ReportField { label, value: value.into() }
}

pub fn build_report(inspection: &Inspection) -> InspectionReport {
    let machine = &inspection.machine;
    let maintainer = &inspection.maintainer;

    let cabecalho = vec![
        (
            field("Máquina", format!("{} - {}", machine.tag, machine.nome)),
            field("Data", local_time(inspection.created_at)),
        ),
        (field("Setor", or_dash(&machine.setor)), field("Unidade", or_dash(&machine.unidade))),
        (field("Local", or_dash(&machine.local_unidade)), field("LAC", or_dash(&machine.lac))),
        (
            field("Mantenedor", format!("{} - {}", maintainer.matricula, maintainer.nome)),
            field("O.S.", or_dash(inspection.os_numero.as_deref().unwrap_or_default())),
        ),
        (
            field("Checklist", inspection.template.nome.clone()),
            field("Não conformidades", inspection.qtd_nc.to_string()),
        ),
    ];

    let itens = inspection
        .answers
        .iter()
        .enumerate()
        .map(|(i, answer)| ReportItem {
            numero: i + 1,
            pergunta: answer.question_text.clone(),
            resposta: response_text(answer.response, answer.recurrence),
            observacao: answer.observation.clone(),
            fotos: answer.photo_urls.len(),
            tratativa: inspection
                .non_conformity_treatments
                .iter()
                .find(|t| t.question_id == answer.question_id)
                .map(treatment_text),
        })
        .collect();

    let assinatura_pcm = match &inspection.pcm_sign {
        Some(sign) => ReportSignature {
            legenda: "Assinatura PCM",
            nome: sign.nome.clone(),
            detalhe: Some(match sign.cargo.as_deref().filter(|c| !c.trim().is_empty()) {
                Some(cargo) => format!("{} - {}", cargo.trim(), local_time(sign.signed_at)),
                None => local_time(sign.signed_at),
            }),
            imagem_url: Some(sign.assinatura_url.clone()),
        },
        None => ReportSignature {
            legenda: "Assinatura PCM",
            nome: "Pendente".to_string(),
            detalhe: None,
            imagem_url: None,
        },
    };

    InspectionReport {
        titulo: "RELATÓRIO DE INSPEÇÃO DE MANUTENÇÃO".to_string(),
        cabecalho,
        itens,
        observacoes: inspection
            .observacoes
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or("Sem observações.")
            .to_string(),
        assinatura_mantenedor: ReportSignature {
            legenda: "Assinatura do mantenedor",
            nome: maintainer.nome.clone(),
            detalhe: Some(format!("Matrícula {}", maintainer.matricula)),
            imagem_url: inspection.assinatura_url.clone(),
        },
        assinatura_pcm,
        filename: format!(
            "inspecao-{}-{}.pdf",
            filename_part(&machine.tag),
            inspection.created_at.format("%Y%m%d")
        ),
    }
}

/// Assinaturas vêm com fundo transparente; o PDF não aceita canal alfa.
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let blend = |c: u8| ((c as u32 * a as u32 + 255 * (255 - a as u32)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

// --- RENDERIZAÇÃO ---

fn pdf_err(e: genpdf::error::Error) -> AppError {
    AppError::PdfError(e.to_string())
}

fn signature_cell(signature: &ReportSignature, image: Option<DynamicImage>) -> Result<elements::LinearLayout, AppError> {
    let mut cell = elements::LinearLayout::vertical();

    match image {
        Some(img) => {
            let pdf_image = elements::Image::from_dynamic_image(img)
                .map_err(pdf_err)?
                .with_scale(genpdf::Scale::new(SIGNATURE_SCALE, SIGNATURE_SCALE))
                .with_alignment(Alignment::Center);
            cell.push(pdf_image);
        }
        None => cell.push(elements::Break::new(3)),
    }

    let mut nome = elements::Paragraph::new(signature.nome.clone());
    nome.set_alignment(Alignment::Center);
    cell.push(nome.styled(style::Style::new().bold()));

    if let Some(detalhe) = &signature.detalhe {
        let mut p = elements::Paragraph::new(detalhe.clone());
        p.set_alignment(Alignment::Center);
        cell.push(p);
    }

    let mut legenda = elements::Paragraph::new(signature.legenda);
    legenda.set_alignment(Alignment::Center);
    cell.push(legenda.styled(style::Style::new().italic()));

    Ok(cell)
}

fn render(
    report: InspectionReport,
    fonts_dir: PathBuf,
    font_family: String,
    maintainer_signature: Option<DynamicImage>,
    pcm_signature: Option<DynamicImage>,
) -> Result<Vec<u8>, AppError> {
    let fonts = genpdf::fonts::from_files(&fonts_dir, &font_family, None).map_err(|_| {
        AppError::FontNotFound(format!("Fonte '{}' não encontrada em {}", font_family, fonts_dir.display()))
    })?;

    let mut doc = genpdf::Document::new(fonts);
    doc.set_title(report.titulo.clone());
    doc.set_font_size(BODY_FONT_SIZE);
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(PAGE_MARGIN_MM);
    doc.set_page_decorator(decorator);

    // --- TÍTULO ---
    let mut titulo = elements::Paragraph::new(report.titulo.clone());
    titulo.set_alignment(Alignment::Center);
    doc.push(titulo.styled(style::Style::new().bold().with_font_size(TITLE_FONT_SIZE)));
    doc.push(elements::Break::new(1));

    // --- CABEÇALHO (duas colunas) ---
    let mut header = elements::TableLayout::new(vec![1, 1]);
    header.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    let label_style = style::Style::new().bold();
    for (left, right) in &report.cabecalho {
        header
            .row()
            .element(
                elements::Paragraph::default()
                    .styled_string(format!("{}: ", left.label), label_style)
                    .string(left.value.clone())
                    .padded(1),
            )
            .element(
                elements::Paragraph::default()
                    .styled_string(format!("{}: ", right.label), label_style)
                    .string(right.value.clone())
                    .padded(1),
            )
            .push()
            .map_err(pdf_err)?;
    }
    doc.push(header);
    doc.push(elements::Break::new(1));

    // --- ITENS (um quadro por item) ---
    doc.push(elements::Paragraph::new("Itens inspecionados").styled(style::Style::new().bold().with_font_size(SECTION_FONT_SIZE)));
    for item in &report.itens {
        let mut body = elements::LinearLayout::vertical();
        body.push(
            elements::Paragraph::new(format!("{}. {}", item.numero, item.pergunta)).styled(style::Style::new().bold()),
        );
        body.push(elements::Paragraph::new(format!("Resposta: {}", item.resposta)));
        if let Some(obs) = &item.observacao {
            body.push(elements::Paragraph::new(format!("Observação: {}", obs)));
        }
        if item.fotos > 0 {
            body.push(elements::Paragraph::new(format!("Fotos anexadas: {}", item.fotos)).styled(style::Style::new().italic()));
        }
        if let Some(tratativa) = &item.tratativa {
            body.push(elements::Paragraph::new(tratativa.clone()));
        }
        doc.push(elements::FramedElement::new(body.padded(1)));
    }
    doc.push(elements::Break::new(1));

    // --- OBSERVAÇÕES GERAIS ---
    doc.push(elements::Paragraph::new("Observações gerais").styled(style::Style::new().bold().with_font_size(SECTION_FONT_SIZE)));
    doc.push(elements::FramedElement::new(elements::Paragraph::new(report.observacoes.clone()).padded(1)));
    doc.push(elements::Break::new(2));

    // --- ASSINATURAS ---
    let mut signatures = elements::TableLayout::new(vec![1, 1]);
    signatures.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    signatures
        .row()
        .element(signature_cell(&report.assinatura_mantenedor, maintainer_signature)?.padded(2))
        .element(signature_cell(&report.assinatura_pcm, pcm_signature)?.padded(2))
        .push()
        .map_err(pdf_err)?;
    doc.push(signatures);

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_err)?;
    Ok(buffer)
}

#[derive(Clone)]
pub struct DocumentService {
    images: Arc<dyn ImageStore>,
    fonts_dir: PathBuf,
    font_family: String,
}

impl DocumentService {
    pub fn new(images: Arc<dyn ImageStore>, fonts_dir: PathBuf, font_family: String) -> Self {
        Self { images, fonts_dir, font_family }
    }

    // Assinatura ilegível não impede o relatório: sai só o nome
    async fn load_signature(&self, url: Option<&str>) -> Option<DynamicImage> {
        let url = url?;
        let bytes = match self.images.load(url).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::warn!("Assinatura {} não encontrada no armazenamento local", url);
                return None;
            }
            Err(e) => {
                tracing::warn!("Falha ao ler assinatura {}: {}", url, e);
                return None;
            }
        };
        match image::load_from_memory(&bytes) {
            Ok(img) => Some(DynamicImage::ImageRgb8(flatten_on_white(&img))),
            Err(e) => {
                tracing::warn!("Assinatura {} não é uma imagem válida: {}", url, e);
                None
            }
        }
    }

    /// Gera o PDF e devolve (nome do arquivo, bytes).
    pub async fn generate_inspection_pdf(&self, inspection: &Inspection) -> Result<(String, Vec<u8>), AppError> {
        let report = build_report(inspection);
        let maintainer_signature = self.load_signature(report.assinatura_mantenedor.imagem_url.as_deref()).await;
        let pcm_signature = self.load_signature(report.assinatura_pcm.imagem_url.as_deref()).await;

        let filename = report.filename.clone();
        let fonts_dir = self.fonts_dir.clone();
        let font_family = self.font_family.clone();

        // Layout e compressão são síncronos
        let bytes = tokio::task::spawn_blocking(move || {
            render(report, fonts_dir, font_family, maintainer_signature, pcm_signature)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de geração do PDF: {}", e))??;

        tracing::info!("PDF da inspeção {} gerado ({} bytes)", inspection.id, bytes.len());
        Ok((filename, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inspection::{Answer, MachineSnapshot, MaintainerSnapshot, PcmSign, TemplateSnapshot};
    use chrono::{NaiveDate, TimeZone};
    use image::Rgba;
    use uuid::Uuid;

    fn inspection() -> Inspection {
        let created_at = Utc.with_ymd_and_hms(2026, 3, 10, 15, 30, 0).unwrap();
        Inspection {
            id: Uuid::new_v4(),
            machine: MachineSnapshot {
                id: Uuid::new_v4(),
                tag: "SEC-001".into(),
                nome: "Secador de grãos".into(),
                setor: "Armazém".into(),
                unidade: "Unidade 2".into(),
                local_unidade: String::new(),
                lac: "LAC-7".into(),
            },
            template: TemplateSnapshot { id: Uuid::new_v4(), nome: "Checklist secador".into() },
            maintainer: MaintainerSnapshot { id: Uuid::new_v4(), matricula: "1234".into(), nome: "João".into() },
            os_numero: None,
            observacoes: Some("  ".into()),
            assinatura_url: Some("/uploads/inspecoes/assinaturas/a.png".into()),
            answers: vec![
                Answer {
                    question_id: "i1".into(),
                    question_text: "Tensão da correia".into(),
                    response: Resposta::Nc,
                    observation: Some("Folga".into()),
                    photo_urls: vec!["/uploads/f1.jpg".into(), "/uploads/f2.jpg".into()],
                    recurrence: true,
                },
                Answer {
                    question_id: "i2".into(),
                    question_text: "Ruído do motor".into(),
                    response: Resposta::C,
                    observation: None,
                    photo_urls: vec![],
                    recurrence: false,
                },
            ],
            qtd_nc: 1,
            pcm_sign: None,
            non_conformity_treatments: vec![Treatment {
                question_id: "i1".into(),
                summary: Some("Trocar correia".into()),
                responsible: Some("Mecânica".into()),
                due_date: NaiveDate::from_ymd_opt(2026, 3, 20),
                status: TreatmentStatus::InProgress,
                created_at,
                updated_at: None,
            }],
            issues_criadas: vec![],
            issues_resolvidas: vec![],
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_report_header_and_items() {
        let report = build_report(&inspection());

        assert_eq!(report.cabecalho.len(), 5);
        assert_eq!(report.cabecalho[0].0.value, "SEC-001 - Secador de grãos");
        // 15:30 UTC = 12:30 em Brasília
        assert_eq!(report.cabecalho[0].1.value, "10/03/2026 12:30");
        assert_eq!(report.cabecalho[2].0.value, "-");
        assert_eq!(report.cabecalho[3].1.value, "-");
        assert_eq!(report.cabecalho[4].1.value, "1");

        assert_eq!(report.itens.len(), 2);
        assert_eq!(report.itens[0].numero, 1);
        assert_eq!(report.itens[0].resposta, "NC - Não conforme (recorrente)");
        assert_eq!(report.itens[0].fotos, 2);
        assert_eq!(
            report.itens[0].tratativa.as_deref(),
            Some("Tratativa: Em andamento | Trocar correia | Responsável: Mecânica | Prazo: 20/03/2026")
        );
        assert_eq!(report.itens[1].tratativa, None);
        assert_eq!(report.observacoes, "Sem observações.");
        assert_eq!(report.filename, "inspecao-SEC-001-20260310.pdf");
    }

    #[test]
    fn test_filename_is_header_safe() {
        let mut insp = inspection();
        insp.machine.tag = "PRENSA \"Nº 2\"/é".into();
        let report = build_report(&insp);
        assert_eq!(report.filename, "inspecao-PRENSA__N__2___-20260310.pdf");
        assert!(axum::http::HeaderValue::from_str(&format!("inline; filename=\"{}\"", report.filename)).is_ok());

        insp.machine.tag = "  ".into();
        assert_eq!(build_report(&insp).filename, "inspecao-maquina-20260310.pdf");
    }

    #[test]
    fn test_report_signatures() {
        let mut insp = inspection();
        let report = build_report(&insp);
        assert_eq!(report.assinatura_pcm.nome, "Pendente");
        assert_eq!(report.assinatura_pcm.imagem_url, None);
        assert_eq!(report.assinatura_mantenedor.detalhe.as_deref(), Some("Matrícula 1234"));

        insp.pcm_sign = Some(PcmSign {
            nome: "Maria".into(),
            cargo: Some("Coordenadora PCM".into()),
            assinatura_url: "/uploads/inspecoes/assinaturas-pcm/b.png".into(),
            signed_at: Utc.with_ymd_and_hms(2026, 3, 11, 12, 0, 0).unwrap(),
        });
        let report = build_report(&insp);
        assert_eq!(report.assinatura_pcm.nome, "Maria");
        assert_eq!(report.assinatura_pcm.detalhe.as_deref(), Some("Coordenadora PCM - 11/03/2026 09:00"));
    }

    #[test]
    fn test_flatten_on_white() {
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));

        let flat = flatten_on_white(&DynamicImage::ImageRgba8(img));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }
}
