//! Instruction prompt for the multimodal extraction call.

const PROMPT_HEADER: &str = "\
Você é um extrator de dados de documentos financeiros brasileiros \
(recibos, notas fiscais, boletos e faturas de cartão de crédito). \
Analise o documento anexo e responda com EXATAMENTE UM objeto JSON, \
sem comentários e sem texto fora do JSON.";

const SINGLE_SHAPE: &str = r#"Se o documento for um recibo, nota fiscal ou boleto com uma única despesa, use o formato:
{
  "merchant": "nome do estabelecimento",
  "date": "data em ISO-8601 (YYYY-MM-DD)",
  "amount": 123.45,
  "category": "categoria sugerida",
  "items": [
    {"description": "item", "quantity": 1, "unitPrice": 10.0, "totalPrice": 10.0}
  ]
}"#;

const STATEMENT_SHAPE: &str = r#"Se o documento for uma fatura de cartão de crédito com várias transações, use o formato:
{
  "isMultiTransaction": true,
  "statementInfo": {
    "institution": "banco ou bandeira",
    "cardLastDigits": "1234",
    "dueDate": "YYYY-MM-DD",
    "totalAmount": 1234.56,
    "creditLimit": 5000.0,
    "periodStart": "YYYY-MM-DD",
    "periodEnd": "YYYY-MM-DD",
    "holderName": "nome do titular"
  },
  "transactions": [
    {
      "merchant": "estabelecimento",
      "date": "YYYY-MM-DD",
      "amount": 99.90,
      "category": "categoria sugerida",
      "description": "texto da linha",
      "installmentInfo": "Parcela 2 de 12",
      "cardLastDigits": "1234",
      "isRefund": false
    }
  ]
}"#;

/// Build the extraction prompt, injecting the caller's category taxonomy
/// as advisory context for category suggestions.
pub fn build_extraction_prompt(categories: &[String]) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(PROMPT_HEADER);
    prompt.push_str("\n\n");
    prompt.push_str(SINGLE_SHAPE);
    prompt.push_str("\n\n");
    prompt.push_str(STATEMENT_SHAPE);
    prompt.push_str(
        "\n\nEscolha o formato pelo conteúdo do documento: use o formato de \
fatura somente quando houver múltiplas transações listadas. Valores \
monetários sempre como números simples (ponto decimal, sem R$). Campos \
desconhecidos podem ser omitidos.",
    );

    if !categories.is_empty() {
        prompt.push_str("\n\nCategorias existentes do usuário (prefira uma delas): ");
        prompt.push_str(&categories.join(", "));
    }

    prompt
}
