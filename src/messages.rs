//! User-facing messages shown by the HTML forms.

pub const USERNAME_REQUIRED: &str = "Defina um username.";
pub const PASSWORD_REQUIRED: &str = "Defina uma senha.";
pub const USERNAME_INCORRECT: &str = "Username incorreto.";
pub const PASSWORD_INCORRECT: &str = "Senha incorreta.";
pub const TITLE_REQUIRED: &str = "Título é obrigatório.";
pub const BODY_REQUIRED: &str = "Conteúdo é obrigatório.";
pub const REPLY_REQUIRED: &str = "A resposta não pode ser vazia.";
pub const POST_NOT_FOUND: &str = "O post não existe.";
pub const FORBIDDEN: &str = "Você não tem permissão para isso.";
pub const LOGIN_REQUIRED: &str = "Faça login para continuar.";
pub const DB_INITIALIZED: &str = "Banco de dados inicializado.";

pub fn username_taken(username: &str) -> String {
    format!("Username {} já está registrado.", username)
}
